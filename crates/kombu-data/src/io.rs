//! File loading and saving.
//!
//! Three on-disk layouts are recognized, dispatched by file extension:
//!
//! - **Native container** (`.kombu`): magic, stamped format version, dtype
//!   tag, and shape, followed by the raw row-major payload. The only
//!   format with a writer here.
//! - **vecs family** (`.fvecs` for f32, `.bvecs` for u8): repeated records
//!   of a little-endian `u32` dimension followed by that many elements.
//!   Every record must agree on the dimension.
//! - **DiskANN binary** (`.bin`): `u32` count and `u32` dimension header,
//!   then the row-major payload.
//!
//! Readers go through a memory map; writes are buffered. All multi-byte
//! fields are little-endian.

use crate::traits::Dataset;
use crate::SimpleData;
use kombu_core::{Error, Result, VectorElement, Version};
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Format version stamped into native container files.
///
/// Readers reject files whose major component differs.
pub const FORMAT_VERSION: Version = Version::new(0, 1, 0);

const NATIVE_MAGIC: &[u8; 8] = b"KOMBUVEC";
const NATIVE_HEADER_LEN: usize = 32;

fn truncated(path: &Path) -> Error {
    Error::Parse(format!("{}: file truncated", path.display()))
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap())
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap())
}

/// Decode `count` little-endian elements starting at `offset`.
fn read_elements<T: VectorElement>(bytes: &[u8], offset: usize, count: usize, out: &mut Vec<T>) {
    let elem = T::DTYPE.size_in_bytes();
    out.reserve(count);
    for k in 0..count {
        out.push(T::read_le(&bytes[offset + k * elem..]));
    }
}

/// Load a dataset, choosing the format from the file extension.
pub fn load_auto<T: VectorElement>(path: impl AsRef<Path>) -> Result<SimpleData<T>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    match extension {
        "kombu" => load_native(path),
        "fvecs" if T::DTYPE == kombu_core::DType::F32 => load_vecs(path),
        "bvecs" if T::DTYPE == kombu_core::DType::U8 => load_vecs(path),
        "fvecs" | "bvecs" => Err(Error::UnknownFormat(format!(
            "extension `{extension}` does not store {:?} elements",
            T::DTYPE
        ))),
        "bin" => load_diskann_bin(path),
        other => Err(Error::UnknownFormat(format!(
            "unrecognized extension `{other}` for {}",
            path.display()
        ))),
    }
}

/// Load a vecs-family file: records of `u32` dimension + elements.
pub fn load_vecs<T: VectorElement>(path: impl AsRef<Path>) -> Result<SimpleData<T>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };
    let bytes = &mmap[..];
    let elem = T::DTYPE.size_in_bytes();

    let mut offset = 0;
    let mut dimensions = 0usize;
    let mut elements = Vec::new();
    while offset < bytes.len() {
        if offset + 4 > bytes.len() {
            return Err(truncated(path));
        }
        let d = read_u32(bytes, offset) as usize;
        offset += 4;

        if d == 0 {
            return Err(Error::Parse(format!(
                "{}: zero-dimensional record",
                path.display()
            )));
        }
        if dimensions == 0 {
            dimensions = d;
        } else if d != dimensions {
            return Err(Error::Parse(format!(
                "{}: record dimension {d} disagrees with {dimensions}",
                path.display()
            )));
        }

        let payload = d * elem;
        if offset + payload > bytes.len() {
            return Err(truncated(path));
        }
        read_elements(bytes, offset, d, &mut elements);
        offset += payload;
    }

    if dimensions == 0 {
        return Err(Error::Parse(format!(
            "{}: contains no records",
            path.display()
        )));
    }

    let data = SimpleData::from_flat(elements, dimensions)?;
    debug!(n = data.size(), d = dimensions, path = %path.display(), "loaded vecs file");
    Ok(data)
}

/// Load a DiskANN-style `.bin` file: `u32 n`, `u32 d`, row-major payload.
pub fn load_diskann_bin<T: VectorElement>(path: impl AsRef<Path>) -> Result<SimpleData<T>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };
    let bytes = &mmap[..];

    if bytes.len() < 8 {
        return Err(truncated(path));
    }
    let n = read_u32(bytes, 0) as usize;
    let d = read_u32(bytes, 4) as usize;
    if d == 0 {
        return Err(Error::Parse(format!(
            "{}: zero-dimensional file",
            path.display()
        )));
    }

    let payload = n
        .checked_mul(d)
        .and_then(|c| c.checked_mul(T::DTYPE.size_in_bytes()))
        .ok_or_else(|| Error::Parse(format!("{}: absurd shape {n} x {d}", path.display())))?;
    if bytes.len() != 8 + payload {
        return Err(Error::Parse(format!(
            "{}: payload is {} bytes, header promises {payload}",
            path.display(),
            bytes.len() - 8
        )));
    }

    let mut elements = Vec::new();
    read_elements(bytes, 8, n * d, &mut elements);
    let data = SimpleData::from_flat(elements, d)?;
    debug!(n, d, path = %path.display(), "loaded DiskANN bin file");
    Ok(data)
}

/// Load a native container file.
pub fn load_native<T: VectorElement>(path: impl AsRef<Path>) -> Result<SimpleData<T>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };
    let bytes = &mmap[..];

    if bytes.len() < NATIVE_HEADER_LEN {
        return Err(truncated(path));
    }
    if &bytes[..8] != NATIVE_MAGIC {
        return Err(Error::Parse(format!(
            "{}: not a native container (bad magic)",
            path.display()
        )));
    }

    let version = Version::new(
        read_u16(bytes, 8) as u64,
        read_u16(bytes, 10) as u64,
        read_u16(bytes, 12) as u64,
    );
    if version.major != FORMAT_VERSION.major {
        return Err(Error::Parse(format!(
            "{}: incompatible format version {version}, reader supports {FORMAT_VERSION}",
            path.display()
        )));
    }

    let code = bytes[14];
    if code != T::DTYPE.code() {
        return Err(Error::UnknownFormat(format!(
            "{}: container holds dtype code {code}, expected {:?}",
            path.display(),
            T::DTYPE
        )));
    }

    let n = read_u64(bytes, 16) as usize;
    let d = read_u64(bytes, 24) as usize;
    if d == 0 {
        return Err(Error::Parse(format!(
            "{}: zero-dimensional file",
            path.display()
        )));
    }
    let payload = n
        .checked_mul(d)
        .and_then(|c| c.checked_mul(T::DTYPE.size_in_bytes()))
        .ok_or_else(|| Error::Parse(format!("{}: absurd shape {n} x {d}", path.display())))?;
    if bytes.len() != NATIVE_HEADER_LEN + payload {
        return Err(truncated(path));
    }

    let mut elements = Vec::new();
    read_elements(bytes, NATIVE_HEADER_LEN, n * d, &mut elements);
    let data = SimpleData::from_flat(elements, d)?;
    debug!(n, d, %version, path = %path.display(), "loaded native container");
    Ok(data)
}

/// Write a dataset as a native container file.
pub fn save_native<T: VectorElement>(data: &SimpleData<T>, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writer.write_all(NATIVE_MAGIC)?;
    writer.write_all(&(FORMAT_VERSION.major as u16).to_le_bytes())?;
    writer.write_all(&(FORMAT_VERSION.minor as u16).to_le_bytes())?;
    writer.write_all(&(FORMAT_VERSION.patch as u16).to_le_bytes())?;
    writer.write_all(&[T::DTYPE.code(), 0])?;
    writer.write_all(&(data.size() as u64).to_le_bytes())?;
    writer.write_all(&(data.dimensions() as u64).to_le_bytes())?;

    let mut row = Vec::with_capacity(data.dimensions() * T::DTYPE.size_in_bytes());
    for &element in data.as_slice() {
        element.write_le(&mut row);
        if row.len() >= 8192 {
            writer.write_all(&row)?;
            row.clear();
        }
    }
    writer.write_all(&row)?;
    writer.flush()?;
    Ok(())
}
