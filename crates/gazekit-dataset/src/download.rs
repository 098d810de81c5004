//! Fetching and unpacking dataset resources
//!
//! Each resource is fetched once from the first mirror of its content type.
//! There are no retries and no failover to further mirrors.

use crate::content::ContentType;
use crate::definition::DatasetDefinition;
use crate::error::{DatasetError, Result};
use crate::paths::DatasetPaths;
use gazekit_archive::{extract_archive, ArchiveError, ExtractOptions};
use log::{debug, info};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Options for [`download_dataset`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Extract the downloaded archives afterwards
    pub extract: bool,
    /// Remove archives after extraction
    pub remove_finished: bool,
    /// Skip extracted files that already exist with the right size
    pub resume: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            extract: true,
            remove_finished: false,
            resume: true,
        }
    }
}

/// Hex MD5 digest of a file.
pub fn md5_file(path: &Path) -> Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut context = md5::Context::new();
    io::copy(&mut reader, &mut context)?;
    Ok(format!("{:x}", context.compute()))
}

fn verify_md5(path: &Path, expected: &str) -> Result<()> {
    let actual = md5_file(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(DatasetError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Download `url` to `dirpath/filename`.
///
/// An existing file is kept when its checksum matches `md5` (or when no
/// checksum is given). Otherwise the response body is streamed to
/// `filename.part`, verified, and renamed into place.
///
/// # Errors
///
/// - [`DatasetError::Http`] for transport errors and error status codes
/// - [`DatasetError::ChecksumMismatch`] if the downloaded file does not match
pub fn download_file(
    url: &str,
    dirpath: &Path,
    filename: &str,
    md5: Option<&str>,
) -> Result<PathBuf> {
    let target = dirpath.join(filename);

    if target.is_file() {
        match md5 {
            Some(expected) if md5_file(&target)?.eq_ignore_ascii_case(expected) => {
                info!("Using downloaded and verified file: {}", target.display());
                return Ok(target);
            }
            None => {
                info!("Using downloaded file: {}", target.display());
                return Ok(target);
            }
            Some(_) => debug!("Checksum of {} differs, downloading again", target.display()),
        }
    }

    fs::create_dir_all(dirpath)?;
    info!("Downloading {url} to {}", target.display());

    let response = ureq::get(url).call().map_err(|e| DatasetError::Http {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let partial = dirpath.join(format!("{filename}.part"));
    let copied = File::create(&partial)
        .and_then(|mut out| io::copy(&mut response.into_reader(), &mut out));
    if let Err(err) = copied {
        // A partial file never survives a failed transfer
        if partial.exists() {
            fs::remove_file(&partial)?;
        }
        return Err(err.into());
    }

    if let Some(expected) = md5 {
        if let Err(err) = verify_md5(&partial, expected) {
            fs::remove_file(&partial)?;
            return Err(err);
        }
    }

    fs::rename(&partial, &target)?;
    Ok(target)
}

fn resource_url(mirror: Option<&String>, resource: &str) -> String {
    match mirror {
        Some(mirror) => format!("{mirror}{resource}"),
        None => resource.to_string(),
    }
}

/// Download every resource of the content types the dataset ships, then
/// optionally extract them.
///
/// # Errors
///
/// - [`DatasetError::NoResources`] if the definition lists no resources
/// - [`DatasetError::MissingResources`] if a shipped content type has none
/// - [`DatasetError::DownloadFailed`] wrapping the first failed resource
pub fn download_dataset(
    definition: &DatasetDefinition,
    paths: &DatasetPaths,
    options: &DownloadOptions,
) -> Result<()> {
    if !definition.has_resources() {
        return Err(DatasetError::NoResources);
    }

    let downloads = paths.downloads();
    for content in definition.has_files.contents() {
        let resources = definition.resources_for(content);
        if resources.is_empty() {
            return Err(DatasetError::MissingResources(content));
        }

        let mirror = definition.mirrors_for(content).first();
        for resource in resources {
            let url = resource_url(mirror, &resource.resource);
            download_file(&url, &downloads, &resource.filename, resource.md5.as_deref()).map_err(
                |source| DatasetError::DownloadFailed {
                    resource: resource.resource.clone(),
                    source: Box::new(source),
                },
            )?;
        }
    }

    if options.extract {
        let extract_options = ExtractOptions {
            recursive: true,
            remove_finished: options.remove_finished,
            remove_top_level: true,
            resume: options.resume,
        };
        extract_dataset(definition, paths, &extract_options)?;
    }
    Ok(())
}

/// Extract downloaded resources into the directory of their content type.
///
/// Resources that are not archives are copied unchanged. Returns all files
/// written.
pub fn extract_dataset(
    definition: &DatasetDefinition,
    paths: &DatasetPaths,
    options: &ExtractOptions,
) -> Result<Vec<PathBuf>> {
    let downloads = paths.downloads();
    let mut files = Vec::new();

    for content in definition.has_files.contents() {
        let destination = paths.content_dir(content);
        fs::create_dir_all(&destination)?;

        for resource in definition.resources_for(content) {
            let source = downloads.join(&resource.filename);
            files.extend(extract_resource(
                &source,
                &destination,
                &resource.filename,
                content,
                options,
            )?);
        }
    }
    Ok(files)
}

fn extract_resource(
    source: &Path,
    destination: &Path,
    filename: &str,
    content: ContentType,
    options: &ExtractOptions,
) -> Result<Vec<PathBuf>> {
    info!("Extracting {filename} ({content}) to {}", destination.display());
    match extract_archive(source, destination, options) {
        Ok(files) => Ok(files),
        Err(ArchiveError::UnknownFileType { .. }) => {
            let target = destination.join(filename);
            fs::copy(source, &target)?;
            debug!("Copied {} as-is", target.display());
            Ok(vec![target])
        }
        Err(err) => Err(err.into()),
    }
}
