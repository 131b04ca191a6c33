use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// A stream of input lines, read one at a time.
///
/// Implementations hand out lines without their terminator. The engine never
/// opens or closes a source; whoever supplies it owns its lifecycle.
pub trait LineSource {
    /// Read the next line, or `None` at end of input.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised by the underlying reader.
    fn next_line(&mut self) -> io::Result<Option<String>>;

    /// A display name for the data currently being read, such as a path.
    fn name(&self) -> Option<&str> {
        None
    }
}

impl<S: LineSource + ?Sized> LineSource for &mut S {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        (**self).next_line()
    }

    fn name(&self) -> Option<&str> {
        (**self).name()
    }
}

impl<S: LineSource + ?Sized> LineSource for Box<S> {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        (**self).next_line()
    }

    fn name(&self) -> Option<&str> {
        (**self).name()
    }
}

/// Line source over any buffered reader.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    name: Option<String>,
}

/// A [`ReaderSource`] over a file, as returned by `FileSource::open`.
pub type FileSource = ReaderSource<BufReader<File>>;

impl<R: BufRead> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, name: None }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl FileSource {
    /// Open `path` for reading. The source is named after the path.
    ///
    /// # Errors
    ///
    /// Returns the error from [`File::open`].
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)).with_name(path.display().to_string()))
    }
}

impl<'a> From<&'a str> for ReaderSource<&'a [u8]> {
    fn from(text: &'a str) -> Self {
        Self::new(text.as_bytes())
    }
}

impl<R: BufRead> LineSource for ReaderSource<R> {
    /// Bytes that are not valid UTF-8 are replaced with U+FFFD rather than
    /// failing the read.
    fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = Vec::new();
        if self.reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        let line = String::from_utf8(buf)
            .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned());
        Ok(Some(line))
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Callback run when [`MultiSource`] starts or finishes one of its sources.
///
/// It receives the source's name; a returned line is injected into the
/// stream at that boundary.
pub type Boundary = Box<dyn FnMut(Option<&str>) -> Option<String> + Send>;

/// Lazily opened files, as used by [`MultiSource::from_paths`].
pub type PathSources =
    std::iter::Map<std::vec::IntoIter<PathBuf>, fn(PathBuf) -> io::Result<FileSource>>;

/// Chains several sources into one stream.
///
/// Sources are taken from the iterator one at a time, only once the previous
/// one is exhausted, and dropped as soon as they end. Reaching the end of one
/// source moves on to the next; the composite ends only when the iterator
/// does. An error opening a source is returned from `next_line` and the
/// composite may be polled again to continue with the next one.
pub struct MultiSource<I, S> {
    sources: I,
    current: Option<S>,
    on_start: Option<Boundary>,
    on_end: Option<Boundary>,
    pending: Option<String>,
    last_name: Option<String>,
}

impl<I, S> MultiSource<I, S>
where
    I: Iterator<Item = io::Result<S>>,
    S: LineSource,
{
    pub fn new<T>(sources: T) -> Self
    where
        T: IntoIterator<IntoIter = I, Item = io::Result<S>>,
    {
        Self {
            sources: sources.into_iter(),
            current: None,
            on_start: None,
            on_end: None,
            pending: None,
            last_name: None,
        }
    }

    /// Run `f` before the first line of each source.
    #[must_use]
    pub fn on_start(
        mut self,
        f: impl FnMut(Option<&str>) -> Option<String> + Send + 'static,
    ) -> Self {
        self.on_start = Some(Box::new(f));
        self
    }

    /// Run `f` after the last line of each source.
    #[must_use]
    pub fn on_end(mut self, f: impl FnMut(Option<&str>) -> Option<String> + Send + 'static) -> Self {
        self.on_end = Some(Box::new(f));
        self
    }
}

impl MultiSource<PathSources, FileSource> {
    /// Chain the files at `paths`, opening each only when it is reached.
    pub fn from_paths<P: Into<PathBuf>>(paths: impl IntoIterator<Item = P>) -> Self {
        let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        let open: fn(PathBuf) -> io::Result<FileSource> = FileSource::open::<PathBuf>;
        Self::new(paths.into_iter().map(open))
    }
}

impl<I, S> LineSource for MultiSource<I, S>
where
    I: Iterator<Item = io::Result<S>>,
    S: LineSource,
{
    fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(line) = self.pending.take() {
                return Ok(Some(line));
            }
            if let Some(source) = self.current.as_mut() {
                if let Some(line) = source.next_line()? {
                    return Ok(Some(line));
                }
                let finished = self.current.take();
                self.last_name = finished.as_ref().and_then(|s| s.name().map(str::to_owned));
                if let Some(on_end) = self.on_end.as_mut() {
                    self.pending = on_end(self.last_name.as_deref());
                }
                continue;
            }
            let Some(next) = self.sources.next() else {
                return Ok(None);
            };
            let source = next?;
            if let Some(on_start) = self.on_start.as_mut() {
                self.pending = on_start(source.name());
            }
            self.last_name = None;
            self.current = Some(source);
        }
    }

    /// The name of the source being read. Between sources this is the name
    /// of the one that just ended.
    fn name(&self) -> Option<&str> {
        match &self.current {
            Some(source) => source.name(),
            None => self.last_name.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(source: &mut impl LineSource) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = source.next_line().unwrap() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn reader_strips_terminators() {
        let mut source = ReaderSource::from("one\r\ntwo\n\nthree");
        assert_eq!(drain(&mut source), ["one", "two", "", "three"]);
        assert_eq!(source.next_line().unwrap(), None);
    }

    #[test]
    fn reader_replaces_invalid_utf8() {
        let mut source = ReaderSource::new(&b"caf\xe9\r\nok\n"[..]);
        assert_eq!(drain(&mut source), ["caf\u{fffd}", "ok"]);
    }

    #[test]
    fn into_inner_keeps_unread_input() {
        let mut source = ReaderSource::from("head\nrest\n");
        assert_eq!(source.next_line().unwrap().as_deref(), Some("head"));
        let mut reader = source.into_inner();
        let mut rest = String::new();
        io::Read::read_to_string(&mut reader, &mut rest).unwrap();
        assert_eq!(rest, "rest\n");
    }

    #[test]
    fn reader_name() {
        let source = ReaderSource::from("x").with_name("inline");
        assert_eq!(source.name(), Some("inline"));
        assert_eq!(ReaderSource::from("x").name(), None);
    }

    #[test]
    fn multi_chains_sources_with_boundaries() {
        let parts = vec![
            Ok(ReaderSource::from("a\nb\n").with_name("first")),
            Ok(ReaderSource::from("").with_name("empty")),
            Ok(ReaderSource::from("c").with_name("last")),
        ];
        let mut source = MultiSource::new(parts)
            .on_start(|name| Some(format!("START {}", name.unwrap_or("?"))))
            .on_end(|name| name.filter(|n| *n != "empty").map(|n| format!("END {n}")));
        assert_eq!(
            drain(&mut source),
            [
                "START first",
                "a",
                "b",
                "END first",
                "START empty",
                "START last",
                "c",
                "END last",
            ]
        );
    }

    #[test]
    fn multi_reports_current_name() {
        let parts = vec![Ok(ReaderSource::from("a").with_name("one"))];
        let mut source = MultiSource::new(parts);
        assert_eq!(source.name(), None);
        assert_eq!(source.next_line().unwrap().as_deref(), Some("a"));
        assert_eq!(source.name(), Some("one"));
    }

    #[test]
    fn open_error_surfaces_then_continues() {
        let parts: Vec<io::Result<ReaderSource<&[u8]>>> = vec![
            Err(io::Error::new(io::ErrorKind::NotFound, "gone")),
            Ok(ReaderSource::from("after")),
        ];
        let mut source = MultiSource::new(parts);
        assert_eq!(
            source.next_line().unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
        assert_eq!(source.next_line().unwrap().as_deref(), Some("after"));
        assert_eq!(source.next_line().unwrap(), None);
    }

    #[test]
    fn boxed_and_borrowed_sources() {
        let mut inner = ReaderSource::from("x\ny");
        let mut borrowed = &mut inner;
        assert_eq!(drain(&mut borrowed), ["x", "y"]);
        let mut boxed: Box<dyn LineSource> = Box::new(ReaderSource::from("z"));
        assert_eq!(drain(&mut boxed), ["z"]);
    }
}
