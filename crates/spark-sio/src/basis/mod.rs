//! 基础流：流栈最底层，直接包装 OS 资源（文件描述符、内存映射）或内存缓冲。

pub mod disk;
pub mod memory;
#[cfg(feature = "mmap")]
pub mod mmap;
pub mod mode;

pub use disk::DiskFile;
pub use memory::MemoryFile;
#[cfg(feature = "mmap")]
pub use mmap::MMapFile;
pub use mode::OpenMode;
