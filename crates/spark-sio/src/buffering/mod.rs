//! 缓冲流：流栈顶层，在内存中累积数据以提供完整的读写、定位与逐行迭代接口。

pub mod duplex;
pub mod input;
pub mod output;

pub use duplex::BufferingInputOutputStream;
pub use input::{BufferingInputStream, Lines};
pub use output::{BufferingOutputStream, LineBufferingOutputStream};
