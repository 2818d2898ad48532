//! Reads the metadata view of one generation from a Portable PDB blob.

use log::debug;

use crate::{
    metadata::{
        root::Root,
        streams::{Blob, Guid, PdbStream, TablesHeader},
        tables::{DocumentRaw, EncMapRaw, MethodDebugInformationRaw},
        view::{GenerationMetadata, MetadataReader},
    },
    Result,
};

/// [`MetadataReader`] for standalone Portable PDB metadata, baselines and EnC deltas alike.
///
/// # Examples
///
/// ```rust,no_run
/// use pdbscope::metadata::{reader::PortablePdbReader, view::MetadataReader};
///
/// let data = std::fs::read("Program.pdb")?;
/// let view = PortablePdbReader.read(&data)?;
/// for document in &view.documents {
///     println!("{}", document.name);
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct PortablePdbReader;

impl PortablePdbReader {
    /// Parse a Portable PDB metadata blob.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] for damaged
    /// metadata, and [`crate::Error::NotSupported`] for metadata that carries type-system
    /// tables.
    pub fn parse(data: &[u8]) -> Result<GenerationMetadata> {
        let root = Root::read(data)?;

        let Some(tables) = root
            .stream(data, "#~")
            .or_else(|| root.stream(data, "#-"))
        else {
            return Err(malformed_error!("Metadata has no tables stream"));
        };

        let force_large = root
            .stream_headers
            .iter()
            .any(|header| header.name == "#JTD");
        let header = TablesHeader::from(tables, force_large)?;

        let blobs = match root.stream(data, "#Blob") {
            Some(heap) => Blob::from(heap)?,
            None => Blob::empty(),
        };
        let guids = match root.stream(data, "#GUID") {
            Some(heap) => Guid::from(heap)?,
            None => Guid::empty(),
        };
        let pdb = root.stream(data, "#Pdb").map(PdbStream::from).transpose()?;

        let documents = header
            .table::<DocumentRaw>()?
            .iter()
            .map(|row| row.to_owned(&blobs, &guids))
            .collect::<Result<Vec<_>>>()?;

        let method_debug_information = header
            .table::<MethodDebugInformationRaw>()?
            .iter()
            .map(|row| row.to_owned(&blobs))
            .collect::<Result<Vec<_>>>()?;

        let enc_map = header
            .table::<EncMapRaw>()?
            .into_iter()
            .map(|row| row.original_token)
            .collect::<Vec<_>>();

        debug!(
            "read metadata '{}': {} documents, {} method debug rows, {} EncMap entries",
            root.version,
            documents.len(),
            method_debug_information.len(),
            enc_map.len()
        );

        Ok(GenerationMetadata {
            pdb,
            documents,
            method_debug_information,
            enc_map,
        })
    }
}

impl MetadataReader for PortablePdbReader {
    fn read(&self, data: &[u8]) -> Result<GenerationMetadata> {
        PortablePdbReader::parse(data)
    }
}
