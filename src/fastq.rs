use flate2::{read::MultiGzDecoder, write::GzEncoder, Compression};
use log::warn;
use memchr::memchr;

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

use crate::errors::*;
use crate::read::*;

/// Default maximum line length in single-end mode.
pub const SINGLE_MAX_LINE_LEN: usize = 4 * 1024 * 1024;
/// Default maximum line length in paired mode.
pub const MAX_LINE_LEN: usize = 8 * 1024 * 1024;

const IO_BUF_SIZE: usize = 1024 * 1024;

/// Where a stream of lines came from, for error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    File(String),
    Stream(&'static str),
}

impl Origin {
    pub fn file(path: impl AsRef<Path>) -> Self {
        Origin::File(path.as_ref().display().to_string())
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Origin::File(file) => write!(f, "\"{}\"", file),
            Origin::Stream(name) => write!(f, "{} stream", name),
        }
    }
}

/// Splits a byte stream into lines, reusing one buffer for every line.
///
/// Lines end at `\n`; a trailing `\r` is dropped and a final line without a newline
/// still counts. A line longer than `max_len` bytes is an error.
pub struct LineReader<R: BufRead> {
    reader: R,
    origin: Origin,
    max_len: usize,
    line: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R, origin: Origin, max_len: usize) -> Self {
        Self {
            reader,
            origin,
            max_len,
            line: 0,
            buf: Vec::new(),
        }
    }

    /// Number of lines read so far.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Read the next line, or `None` at the end of the stream.
    pub fn next_line(&mut self) -> Result<Option<&[u8]>> {
        self.buf.clear();
        let mut saw_bytes = false;

        loop {
            let available = match self.reader.fill_buf() {
                Ok(b) => b,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(Error::StreamIo {
                        origin: self.origin.clone(),
                        source: e,
                    })
                }
            };

            if available.is_empty() {
                if !saw_bytes {
                    return Ok(None);
                }
                break;
            }
            saw_bytes = true;

            let (done, used) = match memchr(b'\n', available) {
                Some(i) => {
                    self.buf.extend_from_slice(&available[..i]);
                    (true, i + 1)
                }
                None => {
                    self.buf.extend_from_slice(available);
                    (false, available.len())
                }
            };
            self.reader.consume(used);

            // one extra byte of slack for a '\r' that is stripped below
            if self.buf.len() > self.max_len.saturating_add(1) {
                return Err(self.too_long());
            }
            if done {
                break;
            }
        }

        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        if self.buf.len() > self.max_len {
            return Err(self.too_long());
        }

        self.line += 1;
        Ok(Some(self.buf.as_slice()))
    }

    fn next_line_owned(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.next_line()?.map(<[u8]>::to_vec))
    }

    fn too_long(&self) -> Error {
        Error::LineTooLong {
            origin: self.origin.clone(),
            line: self.line + 1,
            max: self.max_len,
        }
    }
}

fn check_record(origin: &Origin, first_line: usize, fields: &[Vec<u8>; 4]) -> Result<()> {
    if fields[0].first() != Some(&MARKER) {
        return Err(Error::ParseRecord {
            origin: origin.clone(),
            line: first_line,
            reason: "header line does not start with '@'",
        });
    }
    if fields[1].len() != fields[3].len() {
        return Err(Error::ParseRecord {
            origin: origin.clone(),
            line: first_line + 3,
            reason: "quality line length differs from sequence line length",
        });
    }
    Ok(())
}

fn into_record(fields: [Vec<u8>; 4]) -> Result<Record> {
    let [head, seq, plus, qual] = fields;
    Record::new(head, seq, plus, qual)
}

/// Stream of single-end records pulled four lines at a time.
///
/// A trailing partial record is dropped with a warning. After the end of the stream
/// or an error, the iterator only returns `None`.
pub struct Fastq1Source<R: BufRead> {
    lines: LineReader<R>,
    done: bool,
}

impl<R: BufRead> Fastq1Source<R> {
    pub fn new(reader: R, origin: Origin, max_line_len: usize) -> Self {
        Self {
            lines: LineReader::new(reader, origin, max_line_len),
            done: false,
        }
    }

    fn read_record(&mut self) -> Result<Option<Record>> {
        let first_line = self.lines.line() + 1;
        let mut fields: [Vec<u8>; 4] = Default::default();

        for (i, field) in fields.iter_mut().enumerate() {
            match self.lines.next_line_owned()? {
                Some(line) => *field = line,
                None => {
                    if i > 0 {
                        warn!(
                            "Dropping partial record starting on line {} in {}",
                            first_line,
                            self.lines.origin()
                        );
                    }
                    return Ok(None);
                }
            }
        }

        check_record(self.lines.origin(), first_line, &fields)?;
        Ok(Some(into_record(fields)?))
    }
}

impl<R: BufRead> Iterator for Fastq1Source<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Stream of paired records pulled in lockstep from two FASTQ streams.
///
/// Headers of every pair are compared with the marker stripped; a mismatch is an
/// [`Error::HeaderMismatch`]. The stream ends as soon as either input runs out.
pub struct Fastq2Source<R1: BufRead, R2: BufRead> {
    lines1: LineReader<R1>,
    lines2: LineReader<R2>,
    done: bool,
}

impl<R1: BufRead, R2: BufRead> Fastq2Source<R1, R2> {
    pub fn new(
        reader1: R1,
        origin1: Origin,
        reader2: R2,
        origin2: Origin,
        max_line_len: usize,
    ) -> Self {
        Self {
            lines1: LineReader::new(reader1, origin1, max_line_len),
            lines2: LineReader::new(reader2, origin2, max_line_len),
            done: false,
        }
    }

    fn read_pair(&mut self) -> Result<Option<RecordPair>> {
        let first_line = self.lines1.line() + 1;
        let mut fields1: [Vec<u8>; 4] = Default::default();
        let mut fields2: [Vec<u8>; 4] = Default::default();

        for i in 0..4 {
            let line1 = self.lines1.next_line_owned()?;
            let line2 = self.lines2.next_line_owned()?;

            match (line1, line2) {
                (Some(line1), Some(line2)) => {
                    fields1[i] = line1;
                    fields2[i] = line2;
                }
                (line1, line2) => {
                    if i > 0 {
                        warn!(
                            "Dropping partial pair starting on line {} in {} and {}",
                            first_line,
                            self.lines1.origin(),
                            self.lines2.origin()
                        );
                    } else if line1.is_some() || line2.is_some() {
                        warn!(
                            "{} and {} have different numbers of records, stopping at line {}",
                            self.lines1.origin(),
                            self.lines2.origin(),
                            first_line
                        );
                    }
                    return Ok(None);
                }
            }

            if i == 0 {
                self.check_headers(first_line, &fields1[0], &fields2[0])?;
            }
        }

        check_record(self.lines1.origin(), first_line, &fields1)?;
        check_record(self.lines2.origin(), first_line, &fields2)?;
        Ok(Some(RecordPair::new(
            into_record(fields1)?,
            into_record(fields2)?,
        )))
    }

    fn check_headers(&self, line: usize, head1: &[u8], head2: &[u8]) -> Result<()> {
        let (Some((&MARKER, id1)), Some((&MARKER, id2))) =
            (head1.split_first(), head2.split_first())
        else {
            let origin = if head1.first() != Some(&MARKER) {
                self.lines1.origin()
            } else {
                self.lines2.origin()
            };
            return Err(Error::ParseRecord {
                origin: origin.clone(),
                line,
                reason: "header line does not start with '@'",
            });
        };

        if id1 != id2 {
            return Err(Error::HeaderMismatch {
                origin1: self.lines1.origin().clone(),
                origin2: self.lines2.origin().clone(),
                line,
                head1: utf8(head1),
                head2: utf8(head2),
            });
        }
        Ok(())
    }
}

impl<R1: BufRead, R2: BufRead> Iterator for Fastq2Source<R1, R2> {
    type Item = Result<RecordPair>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.read_pair() {
            Ok(Some(pair)) => Some(Ok(pair)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[must_use]
pub fn iter_fastq1<R: BufRead>(reader: R, origin: Origin, max_line_len: usize) -> Fastq1Source<R> {
    Fastq1Source::new(reader, origin, max_line_len)
}

#[must_use]
pub fn iter_fastq2<R1: BufRead, R2: BufRead>(
    reader1: R1,
    origin1: Origin,
    reader2: R2,
    origin2: Origin,
    max_line_len: usize,
) -> Fastq2Source<R1, R2> {
    Fastq2Source::new(reader1, origin1, reader2, origin2, max_line_len)
}

pub fn write_fastq_record(writer: &mut (impl Write + ?Sized), record: &Record) -> io::Result<()> {
    writer.write_all(record.head())?;
    writer.write_all(b"\n")?;
    writer.write_all(record.seq())?;
    writer.write_all(b"\n")?;
    writer.write_all(record.plus())?;
    writer.write_all(b"\n")?;
    writer.write_all(record.qual())?;
    writer.write_all(b"\n")
}

/// Open a FASTQ file for reading, decompressing it if the name ends in `.gz`.
pub fn open_input(file: impl AsRef<Path>) -> Result<Box<dyn BufRead + Send>> {
    let path = file.as_ref();
    let f = File::open(path).map_err(|e| Error::FileIo {
        file: path.display().to_string(),
        source: e,
    })?;

    let reader: Box<dyn BufRead + Send> = if is_gzip(path) {
        Box::new(BufReader::with_capacity(
            IO_BUF_SIZE,
            MultiGzDecoder::new(f),
        ))
    } else {
        Box::new(BufReader::with_capacity(IO_BUF_SIZE, f))
    };
    Ok(reader)
}

/// Create a FASTQ file for writing, compressing it if the name ends in `.gz`.
pub fn create_output(file: impl AsRef<Path>) -> Result<FastqWriter> {
    let path = file.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::FileIo {
            file: parent.display().to_string(),
            source: e,
        })?;
    }

    let f = File::create(path).map_err(|e| Error::FileIo {
        file: path.display().to_string(),
        source: e,
    })?;

    let writer = if is_gzip(path) {
        FastqWriter::Gzip(BufWriter::with_capacity(
            IO_BUF_SIZE,
            GzEncoder::new(f, Compression::default()),
        ))
    } else {
        FastqWriter::Plain(BufWriter::with_capacity(IO_BUF_SIZE, f))
    };
    Ok(writer)
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Output file created by [`create_output`].
///
/// Call [`FastqWriter::finish`] to flush buffers and write the gzip trailer with
/// errors reported; dropping the writer does the same but ignores failures.
pub enum FastqWriter {
    Plain(BufWriter<File>),
    Gzip(BufWriter<GzEncoder<File>>),
}

impl FastqWriter {
    pub fn finish(self) -> Result<()> {
        match self {
            FastqWriter::Plain(mut w) => w.flush().map_err(Error::WriteIo),
            FastqWriter::Gzip(w) => {
                let encoder = w.into_inner().map_err(|e| Error::WriteIo(e.into_error()))?;
                encoder.finish().map_err(Error::WriteIo)?;
                Ok(())
            }
        }
    }
}

impl Write for FastqWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            FastqWriter::Plain(w) => w.write(buf),
            FastqWriter::Gzip(w) => w.write(buf),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            FastqWriter::Plain(w) => w.write_all(buf),
            FastqWriter::Gzip(w) => w.write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            FastqWriter::Plain(w) => w.flush(),
            FastqWriter::Gzip(w) => w.flush(),
        }
    }
}
