//src/tsv.rs

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{MicrobialFractionError, Result};

fn is_gz(path: &Path) -> bool {
    path.extension().map(|ext| ext == "gz").unwrap_or(false)
}

/// Open a text input, transparently decompressing `.gz` files.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    let f = File::open(path).map_err(|e| MicrobialFractionError::io(path, "opening", e))?;
    if is_gz(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(f))))
    } else {
        Ok(Box::new(BufReader::new(f)))
    }
}

/// A summary or per-taxon destination. Gzip outputs must be closed with
/// [`Output::finish`] so that a failure writing the trailer is reported.
pub enum Output {
    Stdout(BufWriter<io::Stdout>),
    File(BufWriter<File>),
    Gz(BufWriter<GzEncoder<File>>),
}

impl Output {
    /// Flush everything and, for gzip, write the final block and trailer.
    pub fn finish(self) -> io::Result<()> {
        match self {
            Output::Stdout(mut w) => w.flush(),
            Output::File(mut w) => w.flush(),
            Output::Gz(w) => {
                let encoder = w.into_inner().map_err(|e| e.into_error())?;
                encoder.finish()?.sync_all()
            }
        }
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(w) => w.write(buf),
            Output::File(w) => w.write(buf),
            Output::Gz(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(w) => w.flush(),
            Output::File(w) => w.flush(),
            Output::Gz(w) => w.flush(),
        }
    }
}

/// Open an output. `None` or `-` means stdout; `.gz` paths are compressed.
pub fn open_output(destination: Option<&Path>) -> Result<Output> {
    match destination {
        None => Ok(Output::Stdout(BufWriter::new(io::stdout()))),
        Some(path) if path.as_os_str() == "-" => Ok(Output::Stdout(BufWriter::new(io::stdout()))),
        Some(path) => {
            let f = File::create(path)
                .map_err(|e| MicrobialFractionError::io(path, "creating", e))?;
            if is_gz(path) {
                Ok(Output::Gz(BufWriter::new(GzEncoder::new(f, Compression::default()))))
            } else {
                Ok(Output::File(BufWriter::new(f)))
            }
        }
    }
}

/// Tab-separated reader that locates required columns by header name.
pub struct TsvReader<'a> {
    path: &'a Path,
    lines: io::Lines<Box<dyn BufRead>>,
    line_no: usize,
    /// Position of each required column, in the order they were requested.
    columns: Vec<usize>,
}

impl<'a> TsvReader<'a> {
    pub fn open(path: &'a Path, required: &[&str]) -> Result<Self> {
        let mut lines = open_input(path)?.lines();
        let header = match lines.next() {
            Some(line) => line.map_err(|e| MicrobialFractionError::io(path, "reading", e))?,
            None => return Err(MicrobialFractionError::format(path, 1, "file is empty")),
        };
        let names: Vec<&str> = header.trim_end_matches(['\r', '\n']).split('\t').collect();
        let columns = required
            .iter()
            .map(|want| {
                names.iter().position(|n| n.trim() == *want).ok_or_else(|| {
                    MicrobialFractionError::format(
                        path,
                        1,
                        format!("header lacks required column '{}'", want),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            path,
            lines,
            line_no: 1,
            columns,
        })
    }

    /// Next non-blank record as `(line number, required fields)`.
    pub fn next_record(&mut self) -> Result<Option<(usize, Vec<String>)>> {
        loop {
            let line = match self.lines.next() {
                Some(line) => line.map_err(|e| MicrobialFractionError::io(self.path, "reading", e))?,
                None => return Ok(None),
            };
            self.line_no += 1;
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split('\t').collect();
            let fields = self
                .columns
                .iter()
                .map(|&i| {
                    parts.get(i).map(|p| p.trim().to_string()).ok_or_else(|| {
                        MicrobialFractionError::format(
                            self.path,
                            self.line_no,
                            format!("expected at least {} fields, found {}", i + 1, parts.len()),
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            return Ok(Some((self.line_no, fields)));
        }
    }
}
