use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::foundation::error::MapResult;

/// Where the encoded image goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputTarget {
    File(PathBuf),
    Stdout,
}

impl OutputTarget {
    /// Resolve an optional path: relative paths are taken from `cwd`, `None` means stdout.
    pub fn resolve(path: Option<&Path>, cwd: &Path) -> Self {
        match path {
            Some(p) if p.is_absolute() => Self::File(p.to_path_buf()),
            Some(p) => Self::File(cwd.join(p)),
            None => Self::Stdout,
        }
    }

    /// Open a buffered writer, creating missing parent directories for files.
    pub fn open(&self) -> MapResult<Box<dyn Write>> {
        match self {
            Self::File(path) => {
                ensure_parent_dir(path)?;
                Ok(Box::new(BufWriter::new(File::create(path)?)))
            }
            Self::Stdout => Ok(Box::new(BufWriter::new(std::io::stdout()))),
        }
    }
}

pub fn ensure_parent_dir(path: &Path) -> MapResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
