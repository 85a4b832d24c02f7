//! Reads named numeric arrays out of `.npz` archives, `.npy` files and, with
//! the `hdf5` feature, HDF5 files.
//!
//! Every reader opens its file, reads one array and drops the handle before
//! returning, on success and on error alike.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use half::f16;
use ndarray::{ArrayD, IxDyn, ShapeBuilder};
use npyz::{npz::NpzArchive, DType, NpyFile, Order};

use crate::error::{Error, Result};

use super::normalizer::ImageBatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Npz,
    Npy,
    #[cfg(feature = "hdf5")]
    Hdf5,
}

fn format_of(path: &Path) -> Result<Format> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "npz" => Ok(Format::Npz),
        "npy" => Ok(Format::Npy),
        #[cfg(feature = "hdf5")]
        "h5" | "hdf5" => Ok(Format::Hdf5),
        _ => Err(Error::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

fn file_access(path: &Path) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |source| Error::FileAccess {
        path: path.to_path_buf(),
        source,
    }
}

/// Read `field` from the data file at `path` as an `f32` array.
///
/// For `.npz` archives `field` names the member array (without the `.npy`
/// suffix, e.g. `img_pt` or `test/img_pt`). A `.npy` file holds a single array,
/// so `field` is not consulted.
pub fn read_field(path: &Path, field: &str) -> Result<ImageBatch> {
    match format_of(path)? {
        Format::Npz => {
            let mut archive = NpzArchive::open(path).map_err(file_access(path))?;
            let names: Vec<String> = archive.array_names().map(str::to_string).collect();
            let npy = archive.by_name(field).map_err(file_access(path))?;
            match npy {
                Some(npy) => npy_to_array(npy, path, field),
                None => Err(Error::schema(
                    field,
                    format!(
                        "not found in {} (available: {})",
                        path.display(),
                        names.join(", ")
                    ),
                )),
            }
        }
        Format::Npy => {
            tracing::debug!("{} holds a single array, ignoring field `{field}`", path.display());
            let file = File::open(path).map_err(file_access(path))?;
            let npy = NpyFile::new(BufReader::new(file)).map_err(file_access(path))?;
            npy_to_array(npy, path, field)
        }
        #[cfg(feature = "hdf5")]
        Format::Hdf5 => hdf5_store::read_field(path, field),
    }
}

/// Names of the arrays stored in an `.npz` archive. A `.npy` file yields no names.
pub fn list_fields(path: &Path) -> Result<Vec<String>> {
    match format_of(path)? {
        Format::Npz => {
            let archive = NpzArchive::open(path).map_err(file_access(path))?;
            let mut names: Vec<String> = archive.array_names().map(str::to_string).collect();
            names.sort();
            Ok(names)
        }
        Format::Npy => Ok(Vec::new()),
        #[cfg(feature = "hdf5")]
        Format::Hdf5 => hdf5_store::list_fields(path),
    }
}

fn npy_to_array<R: Read>(npy: NpyFile<R>, path: &Path, field: &str) -> Result<ImageBatch> {
    let dims: Vec<usize> = npy.shape().iter().map(|&d| d as usize).collect();
    let fortran = matches!(npy.order(), Order::Fortran);

    let descr = match npy.dtype() {
        DType::Plain(type_str) => type_str.to_string(),
        other => {
            return Err(Error::schema(
                field,
                format!("unsupported structured dtype {other:?}"),
            ))
        }
    };

    // descriptor is e.g. "<f4" or "|u1"; the first char is the byte order
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    let data: Vec<f32> = match descr.get(1..).unwrap_or("") {
        "f4" => npy.into_vec::<f32>().map_err(file_access(path))?,
        "f8" => convert(npy.into_vec::<f64>(), path, |x| x as f32)?,
        "f2" => convert(npy.into_vec::<f16>(), path, f16::to_f32)?,
        "i1" => convert(npy.into_vec::<i8>(), path, f32::from)?,
        "i2" => convert(npy.into_vec::<i16>(), path, f32::from)?,
        "i4" => convert(npy.into_vec::<i32>(), path, |x| x as f32)?,
        "i8" => convert(npy.into_vec::<i64>(), path, |x| x as f32)?,
        "u1" => convert(npy.into_vec::<u8>(), path, f32::from)?,
        "u2" => convert(npy.into_vec::<u16>(), path, f32::from)?,
        "u4" => convert(npy.into_vec::<u32>(), path, |x| x as f32)?,
        "u8" => convert(npy.into_vec::<u64>(), path, |x| x as f32)?,
        _ => {
            return Err(Error::schema(
                field,
                format!("unsupported dtype `{descr}`, expected an integer or float array"),
            ))
        }
    };

    let shape = IxDyn(&dims).set_f(fortran);
    ArrayD::from_shape_vec(shape, data).map_err(|e| Error::schema(field, e.to_string()))
}

fn convert<T, F>(values: std::io::Result<Vec<T>>, path: &Path, f: F) -> Result<Vec<f32>>
where
    F: Fn(T) -> f32,
{
    Ok(values
        .map_err(file_access(path))?
        .into_iter()
        .map(f)
        .collect())
}

/// HDF5 datasets addressed by path from the root group, so `img_pt` is
/// `/img_pt` and `test/img_pt` is `/test/img_pt`.
#[cfg(feature = "hdf5")]
mod hdf5_store {
    use std::path::Path;

    use hdf5::{File, Group};

    use crate::error::{Error, Result};

    use super::ImageBatch;

    fn file_access(path: &Path, err: hdf5::Error) -> Error {
        Error::FileAccess {
            path: path.to_path_buf(),
            source: std::io::Error::other(err.to_string()),
        }
    }

    fn open(path: &Path) -> Result<File> {
        File::open(path).map_err(|e| file_access(path, e))
    }

    pub fn read_field(path: &Path, field: &str) -> Result<ImageBatch> {
        let file = open(path)?;
        let name = field.trim_start_matches('/');

        if !file.link_exists(name) {
            let names = list_fields(path).unwrap_or_default();
            return Err(Error::schema(
                field,
                format!(
                    "not found in {} (available: {})",
                    path.display(),
                    names.join(", ")
                ),
            ));
        }

        let dataset = file
            .dataset(name)
            .map_err(|e| Error::schema(field, e.to_string()))?;
        // integer and float datasets are converted by the library
        dataset
            .read_dyn::<f32>()
            .map_err(|e| Error::schema(field, e.to_string()))
    }

    pub fn list_fields(path: &Path) -> Result<Vec<String>> {
        let file = open(path)?;
        let mut names = Vec::new();
        collect_datasets(&file, &mut names).map_err(|e| file_access(path, e))?;
        names.sort();
        Ok(names)
    }

    fn collect_datasets(group: &Group, names: &mut Vec<String>) -> hdf5::Result<()> {
        for dataset in group.datasets()? {
            names.push(dataset.name().trim_start_matches('/').to_string());
        }
        for child in group.groups()? {
            collect_datasets(&child, names)?;
        }
        Ok(())
    }
}
