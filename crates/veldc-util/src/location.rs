//! Source location tracking.

use std::fmt;
use std::rc::Rc;

/// A position in a source file: file name plus 1-based line number.
///
/// Locations are attached to every token, AST node, and error. The file
/// name is reference-counted so locations stay cheap to clone even though
/// they are passed around by value everywhere.
///
/// # Example
///
/// ```
/// use veldc_util::Location;
///
/// let loc = Location::new("test.veld", 3);
/// assert_eq!(loc.to_string(), "test.veld:3");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    /// Name of the source file, as given on the command line.
    pub filename: Rc<str>,

    /// Line number, starting at 1.
    pub lineno: u32,
}

impl Location {
    /// Creates a location for the given file and line.
    pub fn new(filename: impl Into<Rc<str>>, lineno: u32) -> Self {
        Self {
            filename: filename.into(),
            lineno,
        }
    }

    /// Returns the location one line further down in the same file.
    ///
    /// Indentation errors are reported on the line *after* the newline
    /// token that carries the bad indentation count.
    pub fn next_line(&self) -> Location {
        Location {
            filename: Rc::clone(&self.filename),
            lineno: self.lineno + 1,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filename, self.lineno)
    }
}
