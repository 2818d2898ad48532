//! Serializes a [`GenerationMetadata`] view into standalone Portable PDB metadata.
//!
//! The output is the exact format [`crate::metadata::reader::PortablePdbReader`] consumes:
//! a metadata root with `#Pdb` (baselines only), `#~`, `#Strings`, `#US`, `#GUID` and
//! `#Blob` streams. Deltas additionally get an `EncLog` table with one entry per `EncMap`
//! row. Heaps are deduplicated, and index widths grow to 4 bytes only where row counts or
//! heap sizes require it.
//!
//! This is the producing side of the format, used by tools that convert other symbol
//! formats into a baseline and for crafting test input.

use rustc_hash::FxHashMap;

use crate::{
    file::io::write_le_at,
    metadata::{
        root::METADATA_ROOT_MAGIC,
        streams::PdbStream,
        tables::TableId,
        view::GenerationMetadata,
    },
    utils::{to_u32, write_compressed_uint},
    Result,
};

const VERSION: &[u8] = b"PDB v1.0";

/// Serialize `view` into Portable PDB metadata.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a value does not fit the format, such as a blob
/// longer than `0x1FFF_FFFF` bytes.
pub fn write_metadata(view: &GenerationMetadata) -> Result<Vec<u8>> {
    let mut blobs = BlobHeap::new();
    let mut guids = GuidHeap::default();

    let mut documents = Vec::with_capacity(view.documents.len());
    for document in &view.documents {
        documents.push([
            write_document_name(&mut blobs, &document.name)?,
            guids.add(document.hash_algorithm)?,
            blobs.add(&document.hash)?,
            guids.add(document.language)?,
        ]);
    }

    let mut methods = Vec::with_capacity(view.method_debug_information.len());
    for method in &view.method_debug_information {
        let sequence_points = match &method.sequence_points {
            Some(blob) => blobs.add(blob)?,
            None => 0,
        };
        methods.push([method.document, sequence_points]);
    }

    let mut streams: Vec<(&str, Vec<u8>)> = Vec::with_capacity(6);
    if let Some(pdb) = &view.pdb {
        streams.push(("#Pdb", write_pdb_stream(pdb)));
    }
    streams.push((
        "#~",
        write_tables(view, &documents, &methods, &blobs, &guids)?,
    ));
    streams.push(("#Strings", vec![0; 4]));
    streams.push(("#US", vec![0; 4]));
    streams.push(("#GUID", guids.data));
    streams.push(("#Blob", pad(blobs.data)));

    let version_length = (VERSION.len() + 1 + 3) & !3;
    let headers_size: usize = streams
        .iter()
        .map(|(name, _)| 8 + ((name.len() + 1 + 3) & !3))
        .sum();

    let mut buffer = Vec::new();
    write_le_at(&mut buffer, METADATA_ROOT_MAGIC);
    write_le_at(&mut buffer, 1_u16);
    write_le_at(&mut buffer, 1_u16);
    write_le_at(&mut buffer, 0_u32);
    write_le_at(&mut buffer, to_u32(version_length)?);
    buffer.extend_from_slice(VERSION);
    buffer.resize(16 + version_length, 0);
    write_le_at(&mut buffer, 0_u16);
    write_le_at(&mut buffer, u16::try_from(streams.len()).unwrap_or(u16::MAX));

    let mut stream_offset = buffer.len() + headers_size;
    for (name, data) in &streams {
        write_le_at(&mut buffer, to_u32(stream_offset)?);
        write_le_at(&mut buffer, to_u32(data.len())?);
        let name_start = buffer.len();
        buffer.extend_from_slice(name.as_bytes());
        buffer.resize(name_start + ((name.len() + 1 + 3) & !3), 0);
        stream_offset += data.len();
    }

    for (_, data) in streams {
        buffer.extend_from_slice(&data);
    }

    Ok(buffer)
}

fn pad(mut data: Vec<u8>) -> Vec<u8> {
    data.resize((data.len() + 3) & !3, 0);
    data
}

fn write_pdb_stream(pdb: &PdbStream) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(32);
    buffer.extend_from_slice(&pdb.id);
    write_le_at(&mut buffer, pdb.entry_point.value());
    write_le_at(&mut buffer, pdb.referenced_type_system_tables);
    for (table, rows) in pdb.type_system_table_rows.iter().enumerate() {
        if pdb.referenced_type_system_tables & (1 << table) != 0 {
            write_le_at(&mut buffer, *rows);
        }
    }
    buffer
}

fn write_tables(
    view: &GenerationMetadata,
    documents: &[[u32; 4]],
    methods: &[[u32; 2]],
    blobs: &BlobHeap,
    guids: &GuidHeap,
) -> Result<Vec<u8>> {
    let large_blob = blobs.data.len() > usize::from(u16::MAX);
    let large_guid = guids.count > u32::from(u16::MAX);
    let large_document = documents.len() > usize::from(u16::MAX);

    let mut tables: Vec<(TableId, u32)> = Vec::with_capacity(4);
    if !view.enc_map.is_empty() {
        tables.push((TableId::EncLog, to_u32(view.enc_map.len())?));
        tables.push((TableId::EncMap, to_u32(view.enc_map.len())?));
    }
    if !documents.is_empty() {
        tables.push((TableId::Document, to_u32(documents.len())?));
    }
    if !methods.is_empty() {
        tables.push((TableId::MethodDebugInformation, to_u32(methods.len())?));
    }

    let mut heap_sizes = 0_u8;
    if large_guid {
        heap_sizes |= 0x02;
    }
    if large_blob {
        heap_sizes |= 0x04;
    }

    let valid = tables
        .iter()
        .fold(0_u64, |valid, (table, _)| valid | (1 << *table as u64));

    let mut buffer = Vec::new();
    write_le_at(&mut buffer, 0_u32);
    write_le_at(&mut buffer, 2_u8);
    write_le_at(&mut buffer, 0_u8);
    write_le_at(&mut buffer, heap_sizes);
    write_le_at(&mut buffer, 1_u8);
    write_le_at(&mut buffer, valid);
    write_le_at(&mut buffer, 0_u64);
    for (_, rows) in &tables {
        write_le_at(&mut buffer, *rows);
    }

    if !view.enc_map.is_empty() {
        for token in &view.enc_map {
            write_le_at(&mut buffer, token.value());
            write_le_at(&mut buffer, 0_u32);
        }
        for token in &view.enc_map {
            write_le_at(&mut buffer, token.value());
        }
    }

    for [name, hash_algorithm, hash, language] in documents {
        write_index(&mut buffer, *name, large_blob);
        write_index(&mut buffer, *hash_algorithm, large_guid);
        write_index(&mut buffer, *hash, large_blob);
        write_index(&mut buffer, *language, large_guid);
    }

    for [document, sequence_points] in methods {
        write_index(&mut buffer, *document, large_document);
        write_index(&mut buffer, *sequence_points, large_blob);
    }

    Ok(pad(buffer))
}

fn write_index(buffer: &mut Vec<u8>, value: u32, large: bool) {
    if large {
        write_le_at(buffer, value);
    } else {
        #[allow(clippy::cast_possible_truncation)]
        let value = value as u16;
        write_le_at(buffer, value);
    }
}

/// Encode a document name as a name blob, sharing path parts through the heap.
fn write_document_name(blobs: &mut BlobHeap, name: &str) -> Result<u32> {
    if name.is_empty() {
        return Ok(0);
    }

    let separator = if name.contains('/') {
        Some('/')
    } else if name.contains('\\') {
        Some('\\')
    } else {
        None
    };

    let mut blob = Vec::new();
    match separator {
        Some(separator) => {
            blob.push(separator as u8);
            for part in name.split(separator) {
                write_compressed_uint(blobs.add(part.as_bytes())?, &mut blob)?;
            }
        }
        None => {
            blob.push(0);
            write_compressed_uint(blobs.add(name.as_bytes())?, &mut blob)?;
        }
    }

    blobs.add(&blob)
}

struct BlobHeap {
    data: Vec<u8>,
    index: FxHashMap<Vec<u8>, u32>,
}

impl BlobHeap {
    fn new() -> Self {
        BlobHeap {
            data: vec![0],
            index: FxHashMap::default(),
        }
    }

    fn add(&mut self, blob: &[u8]) -> Result<u32> {
        if blob.is_empty() {
            return Ok(0);
        }
        if let Some(index) = self.index.get(blob) {
            return Ok(*index);
        }

        let index = to_u32(self.data.len())?;
        write_compressed_uint(to_u32(blob.len())?, &mut self.data)?;
        self.data.extend_from_slice(blob);
        self.index.insert(blob.to_vec(), index);
        Ok(index)
    }
}

#[derive(Default)]
struct GuidHeap {
    data: Vec<u8>,
    count: u32,
    index: FxHashMap<[u8; 16], u32>,
}

impl GuidHeap {
    fn add(&mut self, guid: uguid::Guid) -> Result<u32> {
        if guid == uguid::Guid::ZERO {
            return Ok(0);
        }

        let bytes = guid.to_bytes();
        if let Some(index) = self.index.get(&bytes) {
            return Ok(*index);
        }

        self.count += 1;
        self.data.extend_from_slice(&bytes);
        self.index.insert(bytes, self.count);
        Ok(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::{reader::PortablePdbReader, root::Root, streams::Blob},
        test::documents_only,
    };

    #[test]
    fn root_layout() {
        let data = write_metadata(&documents_only(&["/a/A.cs"])).unwrap();
        let root = Root::read(&data).unwrap();

        assert_eq!(root.version, "PDB v1.0");
        let names: Vec<&str> = root.stream_headers.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["#~", "#Strings", "#US", "#GUID", "#Blob"]);
        for header in &root.stream_headers {
            assert_eq!(header.offset % 4, 0);
        }
    }

    #[test]
    fn name_parts_are_shared() {
        let mut blobs = BlobHeap::new();
        let first = write_document_name(&mut blobs, "/src/A.cs").unwrap();
        let heap_after_first = blobs.data.len();
        let second = write_document_name(&mut blobs, "/src/B.cs").unwrap();

        assert_ne!(first, second);
        // "src" is reused, only "B.cs" and the name blob are new
        assert_eq!(blobs.data.len(), heap_after_first + 5 + 5);

        let heap = Blob::from(&blobs.data).unwrap();
        assert_eq!(
            crate::metadata::tables::decode_document_name(&heap, second).unwrap(),
            "/src/B.cs"
        );
    }

    #[test]
    fn large_heaps() {
        let names: Vec<String> = (0..7000).map(|i| format!("/project/src/File{i}.cs")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();

        let view = documents_only(&refs);
        let read = PortablePdbReader::parse(&write_metadata(&view).unwrap()).unwrap();
        assert_eq!(read.documents.len(), 7000);
        assert_eq!(read.documents[6999].name, "/project/src/File6999.cs");
    }
}
