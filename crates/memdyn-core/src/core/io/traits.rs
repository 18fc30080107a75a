use crate::core::mesh::{MeshState, MeshTopology};
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Common interface of the surface mesh file formats.
///
/// Implementors handle format-specific parsing and serialization; the path
/// based helpers only add buffered file handling.
pub trait MeshFile {
    /// Format-specific data that has no place in the mesh itself.
    type Metadata;

    type Error: Error + From<io::Error>;

    /// Reads connectivity and vertex data from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails, the connectivity is not a valid
    /// oriented manifold, or the reader fails.
    fn read_from(
        reader: &mut impl BufRead,
    ) -> Result<(MeshTopology, MeshState, Self::Metadata), Self::Error>;

    /// Writes a mesh and its metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    fn write_to(
        topology: &MeshTopology,
        state: &MeshState,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    fn read_from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<(MeshTopology, MeshState, Self::Metadata), Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    fn write_to_path<P: AsRef<Path>>(
        topology: &MeshTopology,
        state: &MeshState,
        metadata: &Self::Metadata,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(topology, state, metadata, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
