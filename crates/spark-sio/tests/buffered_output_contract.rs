//! 缓冲输出流与行缓冲输出流的刷写边界。

mod support;

use spark_sio::{
    BufferingOutputStream, ErrorKind, LineBufferingOutputStream, LineSeparator, MemoryFile,
    Seekable, Stream, StreamConfig, Truncatable, Whence, Writable,
};
use support::RecordingWriter;

#[test]
fn a_full_buffer_is_written_as_one_block() {
    let mut stream = BufferingOutputStream::with_bufsize(RecordingWriter::default(), 8).unwrap();
    stream.write(b"1234").unwrap();
    assert!(stream.get_ref().writes.is_empty());
    stream.write(b"567890").unwrap();
    assert_eq!(stream.get_ref().writes, vec![b"12345678".to_vec()]);
    assert_eq!(stream.pending(), 2);

    stream.flush().unwrap();
    assert_eq!(
        stream.get_ref().writes,
        vec![b"12345678".to_vec(), b"90".to_vec()]
    );
    assert_eq!(stream.get_ref().flushes, 1);
}

#[test]
fn empty_flush_does_not_touch_the_base() {
    let mut stream = BufferingOutputStream::with_bufsize(RecordingWriter::default(), 8).unwrap();
    stream.flush().unwrap();
    stream.close().unwrap();
    let base = stream.into_inner().unwrap();
    assert!(base.writes.is_empty());
    assert!(base.closed);
}

#[test]
fn non_seekable_base_hides_seek_and_truncate() {
    let mut stream = BufferingOutputStream::new(RecordingWriter::default()).unwrap();
    assert!(stream.as_seekable().is_none());
    assert!(stream.as_truncatable().is_none());
    stream.write(b"abc").unwrap();
    assert_eq!(stream.tell().unwrap(), 3, "位置从 0 起算并随写入累加");
    assert_eq!(
        stream.seek(0, Whence::Start).unwrap_err().kind(),
        ErrorKind::Unsupported
    );
    assert_eq!(
        stream.truncate(None).unwrap_err().kind(),
        ErrorKind::Unsupported
    );
}

#[test]
fn seek_relative_to_end_sees_flushed_data() {
    let mut stream = BufferingOutputStream::with_bufsize(MemoryFile::new(), 64).unwrap();
    stream.write(b"hello world").unwrap();
    stream.seek(-5, Whence::End).unwrap();
    assert_eq!(stream.tell().unwrap(), 6);
    stream.write(b"there").unwrap();
    assert_eq!(stream.into_inner().unwrap().contents(), b"hello there");
}

#[test]
fn line_buffering_flushes_each_complete_line() {
    let config = StreamConfig::default().with_line_separator(LineSeparator::Lf);
    let mut stream =
        LineBufferingOutputStream::with_config(RecordingWriter::default(), &config).unwrap();
    stream.write(b"first\nsec").unwrap();
    assert_eq!(stream.get_ref().contents(), b"first\n");
    stream.write(b"ond\nthird\npartial").unwrap();
    assert_eq!(stream.get_ref().contents(), b"first\nsecond\nthird\n");
    stream.close().unwrap();
    let base = stream.into_inner().unwrap();
    assert_eq!(base.contents(), b"first\nsecond\nthird\npartial");
    assert!(base.closed);
}

#[test]
fn write_lines_concatenates_fragments() {
    let mut stream = BufferingOutputStream::with_bufsize(MemoryFile::new(), 4).unwrap();
    stream.write_lines([&b"ab"[..], b"cd\n", b"ef"]).unwrap();
    assert_eq!(stream.into_inner().unwrap().contents(), b"abcd\nef");
}
