//! CBOR binary image format.
//!
//! Image is a single CBOR value carrying the tombstone count and the list
//! of frames in pre-order, root being the first frame. Each frame refer to
//! its children by position in the list, parent links are left out and
//! re-derived after loading.

use cbordata::{Cborize, FromCbor, IntoCbor};
use log::info;

use std::{convert::TryFrom, fmt};

use crate::{
    avl::{Index, Tree},
    snapshot::{self, Entry},
    util, Config, Result,
};

const IMAGE_VER: u32 = 0x00010001;
const FRAME_VER: u32 = 0x00020001;

#[derive(Debug, Cborize)]
struct Image<K, V> {
    n_deleted: u64,
    frames: Vec<Frame<K, V>>,
}

impl<K, V> Image<K, V> {
    const ID: u32 = IMAGE_VER;
}

#[derive(Debug, Cborize)]
struct Frame<K, V> {
    key: K,
    value: V,
    deleted: bool,
    lower: Option<u64>,
    higher: Option<u64>,
}

impl<K, V> Frame<K, V> {
    const ID: u32 = FRAME_VER;
}

/// Encode `index` into binary image, under read lock.
pub fn encode<K, V>(index: &Index<K, V>) -> Result<Vec<u8>>
where
    K: Clone + IntoCbor,
    V: Clone + IntoCbor,
{
    let image = {
        let tree = index.read();
        let to_pos = |pos: Option<usize>| pos.map(|pos| pos as u64);
        let frames: Vec<Frame<K, V>> = snapshot::flatten(&*tree)
            .into_iter()
            .map(|flat| Frame {
                key: flat.key.clone(),
                value: flat.value.clone(),
                deleted: flat.deleted,
                lower: to_pos(flat.lower),
                higher: to_pos(flat.higher),
            })
            .collect();
        Image {
            n_deleted: tree.deleted_count() as u64,
            frames,
        }
    };

    util::into_cbor_bytes(image)
}

/// Decode binary image into a new [Index] configured with `config`.
pub fn decode<K, V>(config: Config, data: &[u8]) -> Result<Index<K, V>>
where
    K: Ord + fmt::Debug + FromCbor,
    V: FromCbor,
{
    config.check()?;
    let tree = decode_tree(data, config.max_depth)?;
    info!(
        target: "avlidx",
        "{:?}, restored {} entries from binary image", config.name, tree.len()
    );
    Ok(Index::from_tree(config, tree))
}

/// Replace the contents of `index` with the decoded binary image. On
/// error `index` is left untouched.
pub fn restore<K, V>(index: &Index<K, V>, data: &[u8]) -> Result<()>
where
    K: Ord + fmt::Debug + FromCbor,
    V: FromCbor,
{
    let config = index.to_config();
    let tree = decode_tree(data, config.max_depth)?;
    let n = tree.len();
    index.swap(tree);
    info!(target: "avlidx", "{:?}, restored {} entries from binary image", config.name, n);
    Ok(())
}

fn decode_tree<K, V>(data: &[u8], max_depth: usize) -> Result<Tree<K, V>>
where
    K: Ord + fmt::Debug + FromCbor,
    V: FromCbor,
{
    let (image, n): (Image<K, V>, usize) = match util::from_cbor_bytes(data) {
        Ok(res) => res,
        Err(err) => return snapshot::fail(format!("binary image {}", err)),
    };
    if n != data.len() {
        return snapshot::fail(format!("trailing {} bytes", data.len() - n));
    }

    let to_pos = |pos: Option<u64>| -> Result<Option<usize>> {
        match pos.map(usize::try_from) {
            Some(Ok(pos)) => Ok(Some(pos)),
            Some(Err(err)) => snapshot::fail(format!("position {}", err)),
            None => Ok(None),
        }
    };

    let n_deleted = match usize::try_from(image.n_deleted) {
        Ok(n_deleted) => n_deleted,
        Err(err) => return snapshot::fail(format!("n_deleted {}", err)),
    };
    let root = if image.frames.is_empty() { None } else { Some(0) };

    let mut entries = Vec::with_capacity(image.frames.len());
    for frame in image.frames.into_iter() {
        entries.push(Entry {
            key: frame.key,
            value: frame.value,
            deleted: frame.deleted,
            lower: to_pos(frame.lower)?,
            higher: to_pos(frame.higher)?,
        });
    }

    let (tree, _) = snapshot::build(entries, root, n_deleted, max_depth)?;
    Ok(tree)
}

#[cfg(test)]
#[path = "binary_test.rs"]
mod binary_test;
