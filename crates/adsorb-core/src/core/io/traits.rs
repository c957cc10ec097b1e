use crate::core::models::structure::AtomicStructure;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Common interface of structure file formats.
///
/// Implementors parse and serialize a single structure together with whatever
/// per-file metadata the format carries.
pub trait StructureFile {
    /// The type of metadata associated with the file format.
    type Metadata;

    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a structure from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(
        reader: &mut impl BufRead,
    ) -> Result<(AtomicStructure, Self::Metadata), Self::Error>;

    /// Writes a structure and its metadata to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(
        structure: &AtomicStructure,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    fn read_from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<(AtomicStructure, Self::Metadata), Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    fn write_to_path<P: AsRef<Path>>(
        structure: &AtomicStructure,
        metadata: &Self::Metadata,
        path: P,
    ) -> Result<(), Self::Error> {
        Self::write_frames_to_path([(structure, metadata)], path)
    }

    /// Writes structures back to back into one file, as a trajectory.
    ///
    /// Only meaningful for formats whose reader accepts concatenated frames.
    fn write_frames_to_path<'s, P, I>(frames: I, path: P) -> Result<(), Self::Error>
    where
        Self::Metadata: 's,
        P: AsRef<Path>,
        I: IntoIterator<Item = (&'s AtomicStructure, &'s Self::Metadata)>,
    {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        for (structure, metadata) in frames {
            Self::write_to(structure, metadata, &mut writer)?;
        }
        writer.flush()?;
        Ok(())
    }
}
