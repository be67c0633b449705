//! Index persistence.
//!
//! An index is saved as two byte streams so callers can store vectors and
//! graph separately. Both start with a 4-byte magic and a version byte; all
//! integers are little-endian.
//!
//! ## Elements stream
//!
//! ```text
//! "VGEL" | version u8 | dimension u32 | count u64 | count x (len u32 | len x f32)
//! ```
//!
//! ## Graph stream
//!
//! ```text
//! "VGGR" | version u8 | GraphHeader (bincode) | node_count x (degree u32 | degree x id u32)
//! ```
//!
//! Adjacency order is written as-is, so a loaded index searches exactly like
//! the one that was saved.

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, IndexResult};
use crate::store::VectorStore;
use crate::types::{validate_values, VectorId};

use super::config::IndexConfig;
use super::graph::Graph;

/// Magic bytes opening the elements stream.
pub const ELEMENTS_MAGIC: [u8; 4] = *b"VGEL";

/// Magic bytes opening the graph stream.
pub const GRAPH_MAGIC: [u8; 4] = *b"VGGR";

/// Current format version of both streams.
pub const FORMAT_VERSION: u8 = 1;

/// Metadata stored at the front of the graph stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphHeader {
    /// Vector dimension (0 for an empty index).
    pub dimension: u32,
    /// Number of adjacency lists that follow.
    pub node_count: u64,
    /// Search entry point, if the index has one.
    pub entry_point: Option<u32>,
    /// Configuration the graph was built with.
    pub config: IndexConfig,
}

/// Serialize the vector store.
///
/// # Errors
///
/// Returns [`IndexError::Encoding`] if the dimension does not fit in 32 bits.
pub fn encode_elements(store: &VectorStore) -> IndexResult<Vec<u8>> {
    let dimension = store.dimension().unwrap_or(0);
    let dim32 = u32::try_from(dimension)
        .map_err(|_| IndexError::Encoding(format!("dimension {dimension} exceeds u32")))?;

    let mut bytes = Vec::with_capacity(17 + store.len() * (4 + dimension * 4));
    bytes.extend_from_slice(&ELEMENTS_MAGIC);
    bytes.push(FORMAT_VERSION);
    bytes.extend_from_slice(&dim32.to_le_bytes());
    bytes.extend_from_slice(&(store.len() as u64).to_le_bytes());

    for (_, vector) in store.iter() {
        bytes.extend_from_slice(&dim32.to_le_bytes());
        for value in vector {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }

    Ok(bytes)
}

/// Serialize the graph and its header.
///
/// # Errors
///
/// Returns [`IndexError::Encoding`] if the header cannot be encoded or a
/// count does not fit its field.
pub fn encode_graph(graph: &Graph, header: &GraphHeader) -> IndexResult<Vec<u8>> {
    let header_bytes = bincode::serde::encode_to_vec(header, bincode::config::standard())
        .map_err(|e| IndexError::Encoding(format!("failed to encode graph header: {e}")))?;

    let body = (graph.len() + graph.edge_count()) * 4;
    let mut bytes = Vec::with_capacity(5 + header_bytes.len() + body);
    bytes.extend_from_slice(&GRAPH_MAGIC);
    bytes.push(FORMAT_VERSION);
    bytes.extend_from_slice(&header_bytes);

    for list in graph.adjacency() {
        let degree = u32::try_from(list.len())
            .map_err(|_| IndexError::Encoding(format!("degree {} exceeds u32", list.len())))?;
        bytes.extend_from_slice(&degree.to_le_bytes());
        for neighbor in list {
            bytes.extend_from_slice(&neighbor.as_u32().to_le_bytes());
        }
    }

    Ok(bytes)
}

/// Deserialize and validate the elements stream.
///
/// # Errors
///
/// Returns [`IndexError::CorruptData`] on a bad magic or version,
/// truncation, trailing bytes, a record whose length differs from the
/// header dimension, or a vector that would be rejected on insert.
pub fn decode_elements(bytes: &[u8]) -> IndexResult<VectorStore> {
    let mut reader = Reader::new(bytes, "elements");
    reader.expect_preamble(ELEMENTS_MAGIC)?;

    let dimension = reader.read_u32()? as usize;
    let count = usize::try_from(reader.read_u64()?)
        .map_err(|_| IndexError::corrupt("elements: count exceeds address space"))?;

    if count > VectorId::MAX_COUNT {
        return Err(IndexError::corrupt(format!("elements: count {count} exceeds id space")));
    }
    if (count == 0) != (dimension == 0) {
        return Err(IndexError::corrupt(format!(
            "elements: dimension {dimension} inconsistent with count {count}"
        )));
    }
    // Every record needs at least its length prefix plus one float.
    if count.saturating_mul(4 + dimension.saturating_mul(4)) > reader.remaining() {
        return Err(IndexError::corrupt(format!(
            "elements: {count} records of dimension {dimension} exceed stream length"
        )));
    }

    let mut data = Vec::with_capacity(count * dimension);
    for record in 0..count {
        let len = reader.read_u32()? as usize;
        if len != dimension {
            return Err(IndexError::corrupt(format!(
                "elements: record {record} has dimension {len}, expected {dimension}"
            )));
        }
        let start = data.len();
        for _ in 0..len {
            data.push(reader.read_f32()?);
        }
        validate_values(&data[start..])
            .map_err(|e| IndexError::corrupt(format!("elements: record {record}: {e}")))?;
    }
    reader.expect_end()?;

    Ok(VectorStore::from_flat(dimension, data))
}

/// Deserialize the graph stream and validate it against `store`.
///
/// # Errors
///
/// Returns [`IndexError::CorruptData`] if the header is unreadable or
/// disagrees with `store`, an adjacency list is longer than the stored
/// `max_degree` or holds an out-of-range id, a duplicate or a self loop, or
/// the stream is truncated or has trailing bytes.
pub fn decode_graph(bytes: &[u8], store: &VectorStore) -> IndexResult<(Graph, GraphHeader)> {
    let mut reader = Reader::new(bytes, "graph");
    reader.expect_preamble(GRAPH_MAGIC)?;

    let (header, used): (GraphHeader, usize) =
        bincode::serde::decode_from_slice(reader.rest(), bincode::config::standard())
            .map_err(|e| IndexError::corrupt(format!("graph: unreadable header: {e}")))?;
    reader.skip(used)?;

    header
        .config
        .validate()
        .map_err(|e| IndexError::corrupt(format!("graph: stored config rejected: {e}")))?;

    let count = store.len();
    if header.node_count != count as u64 {
        return Err(IndexError::corrupt(format!(
            "graph: {} adjacency lists for {count} elements",
            header.node_count
        )));
    }
    if header.dimension as usize != store.dimension().unwrap_or(0) {
        return Err(IndexError::corrupt(format!(
            "graph: dimension {} does not match elements dimension {}",
            header.dimension,
            store.dimension().unwrap_or(0)
        )));
    }
    match header.entry_point {
        Some(ep) if ep as usize >= count => {
            return Err(IndexError::corrupt(format!(
                "graph: entry point {ep} out of range for {count} elements"
            )));
        }
        None if count > 0 => {
            return Err(IndexError::corrupt("graph: missing entry point"));
        }
        _ => {}
    }

    let mut adjacency = Vec::with_capacity(count);
    for node in 0..count {
        let degree = reader.read_u32()? as usize;
        if degree > header.config.max_degree {
            return Err(IndexError::corrupt(format!(
                "graph: node {node} has {degree} neighbors, max degree is {}",
                header.config.max_degree
            )));
        }
        if degree.saturating_mul(4) > reader.remaining() {
            return Err(IndexError::corrupt(format!(
                "graph: node {node} declares {degree} neighbors past end of stream"
            )));
        }

        let mut list = Vec::with_capacity(degree);
        for _ in 0..degree {
            let neighbor = reader.read_u32()?;
            if neighbor as usize >= count {
                return Err(IndexError::corrupt(format!(
                    "graph: node {node} references id {neighbor} >= {count}"
                )));
            }
            let neighbor = VectorId::new(neighbor);
            if neighbor.index() == node || list.contains(&neighbor) {
                return Err(IndexError::corrupt(format!(
                    "graph: node {node} has a duplicate or self edge to {neighbor}"
                )));
            }
            list.push(neighbor);
        }
        adjacency.push(list);
    }
    reader.expect_end()?;

    Ok((Graph::from_adjacency(adjacency), header))
}

/// Bounds-checked little-endian cursor.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    stream: &'static str,
}

impl<'a> Reader<'a> {
    const fn new(bytes: &'a [u8], stream: &'static str) -> Self {
        Self { bytes, pos: 0, stream }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }

    fn take(&mut self, n: usize) -> IndexResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(IndexError::corrupt(format!(
                "{}: truncated at byte {} (need {n} more)",
                self.stream, self.pos
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn skip(&mut self, n: usize) -> IndexResult<()> {
        self.take(n).map(|_| ())
    }

    fn array<const N: usize>(&mut self) -> IndexResult<[u8; N]> {
        let slice = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn read_u8(&mut self) -> IndexResult<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn read_u32(&mut self) -> IndexResult<u32> {
        self.array().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> IndexResult<u64> {
        self.array().map(u64::from_le_bytes)
    }

    fn read_f32(&mut self) -> IndexResult<f32> {
        self.array().map(f32::from_le_bytes)
    }

    fn expect_preamble(&mut self, magic: [u8; 4]) -> IndexResult<()> {
        if self.array::<4>()? != magic {
            return Err(IndexError::corrupt(format!("{}: bad magic", self.stream)));
        }
        let version = self.read_u8()?;
        if version != FORMAT_VERSION {
            return Err(IndexError::corrupt(format!(
                "{}: unsupported format version {version}",
                self.stream
            )));
        }
        Ok(())
    }

    fn expect_end(&self) -> IndexResult<()> {
        if self.remaining() != 0 {
            return Err(IndexError::corrupt(format!(
                "{}: {} trailing bytes",
                self.stream,
                self.remaining()
            )));
        }
        Ok(())
    }
}
