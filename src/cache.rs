//! Persistence of the built index structures
//!
//! The cache artifact is a 4-byte magic and a big-endian format version,
//! followed by a CBOR body holding the postcode list, the exact index and
//! flattened node arrays for the BK-tree and the trie. Any load failure is
//! recoverable: [`load_or_build`] falls back to a full rebuild, so a stale
//! or corrupt cache can never block startup.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::Instant;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::{info, warn};
use thiserror::Error;

use crate::builder::{build, BuildError};
use crate::index::bktree::{BkTree, FlatBkNode};
use crate::index::exact::ExactIndex;
use crate::index::trie::{FlatTrieNode, Trie};
use crate::search::engine::{Engine, EngineParts};

pub const CACHE_MAGIC: [u8; 4] = *b"PCIX";
pub const CACHE_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("I/O error on cache artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a postcode cache artifact (bad magic)")]
    BadMagic,

    #[error("unsupported cache version {found} (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("could not decode cache artifact: {0}")]
    Decode(#[from] ciborium::de::Error<std::io::Error>),

    /// The body decoded but its flattened node arrays are structurally
    /// invalid (dangling, backward or doubly-claimed child references)
    #[error("corrupt cache artifact ({structure}: {detail})")]
    Corrupt {
        structure: &'static str,
        detail: &'static str,
    },

    #[error("could not encode cache artifact: {0}")]
    Encode(#[from] ciborium::ser::Error<std::io::Error>),

    #[error("could not initialize the engine: {0}")]
    Init(#[from] BuildError),
}

/// Serializes the engine's index structures to `path`.
pub fn save(engine: &Engine, path: &Path) -> Result<(), CacheError> {
    let start = Instant::now();

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&CACHE_MAGIC)?;
    writer.write_u32::<BigEndian>(CACHE_VERSION)?;

    ciborium::ser::into_writer(
        &(
            &engine.postcodes,
            &engine.exact,
            &engine.bk_tree.flatten(),
            &engine.trie.flatten(),
        ),
        &mut writer,
    )?;
    writer.flush()?;

    info!(
        "Saved {} postcodes to cache in {:.2}ms",
        engine.postcodes.len(),
        start.elapsed().as_secs_f64() * 1e3
    );
    Ok(())
}

/// Deserializes an engine from `path`. Wrong magic, version mismatch,
/// truncation and decode failures all surface as [`CacheError`].
pub fn load(path: &Path) -> Result<Engine, CacheError> {
    let start = Instant::now();

    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != CACHE_MAGIC {
        return Err(CacheError::BadMagic);
    }
    let version = reader.read_u32::<BigEndian>()?;
    if version != CACHE_VERSION {
        return Err(CacheError::VersionMismatch {
            found: version,
            expected: CACHE_VERSION,
        });
    }

    let (postcodes, exact, bk_nodes, trie_nodes): (
        Vec<String>,
        ExactIndex,
        Vec<FlatBkNode>,
        Vec<FlatTrieNode>,
    ) = ciborium::de::from_reader(reader)?;

    let bk_tree = BkTree::from_flat(bk_nodes).map_err(|detail| CacheError::Corrupt {
        structure: "BK-tree",
        detail,
    })?;
    let trie = Trie::from_flat(trie_nodes).map_err(|detail| CacheError::Corrupt {
        structure: "trie",
        detail,
    })?;

    let engine = Engine::from_parts(EngineParts {
        exact,
        bk_tree,
        trie,
        postcodes,
    })?;

    info!(
        "Loaded {} postcodes from cache in {:.2}ms",
        engine.len(),
        start.elapsed().as_secs_f64() * 1e3
    );
    Ok(engine)
}

/// Loads the engine from the cache artifact, falling back to a full
/// rebuild from `source` on any cache failure. A freshly built engine is
/// saved back to `path` on a best-effort basis.
pub fn load_or_build<I, E>(path: &Path, source: I) -> Result<Engine, BuildError>
where
    I: IntoIterator<Item = Result<String, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    match load(path) {
        Ok(engine) => Ok(engine),
        Err(CacheError::Init(err)) => Err(err),
        Err(err) => {
            warn!("Cache load failed ({}); rebuilding from source", err);
            let engine = build(source)?;
            if let Err(err) = save(&engine, path) {
                warn!("Could not save postcode cache: {}", err);
            }
            Ok(engine)
        }
    }
}
