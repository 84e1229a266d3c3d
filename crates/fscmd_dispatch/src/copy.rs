//! Recursive tree copy backing the batch tree-copy primitive.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::report::{ReportCopy, ReportCopyBuilder};
use crate::spec::{CopyTreeError, SpecTreeCopyOptions};
use crate::util::{
    calculate_worker_limit, copy_file_with_metadata, create_symbolic_link,
    is_destination_inside_source, should_skip_dir_conflict, should_skip_file_conflict,
};

#[derive(Debug, Clone)]
struct SpecTreeEntry {
    path_src: PathBuf,
    name_entry: String,
    if_is_symlink: bool,
}

#[derive(Debug, Clone)]
struct SpecCopyTaskFile {
    path_file_src: PathBuf,
    path_file_dst: PathBuf,
}

#[derive(Debug)]
struct SpecCopyContext {
    n_workers_max: usize,
    builder_cp_report: ReportCopyBuilder,
    l_tasks_file_copy: Vec<SpecCopyTaskFile>,
}

/// Copy the directory `dir_source` onto `dir_destination`, creating it if needed.
///
/// Both paths must be absolute. Existing directories are merged, existing files
/// overwritten, and symlinks recreated as links. A destination root or
/// subdirectory that is a symlink is never followed.
///
/// Directories are visited depth-first in name order; file copies are planned
/// during the walk and executed afterwards, serially or on a rayon pool sized by
/// `num_workers_max`.
///
/// Returns [`ReportCopy`] when the run completes (per-entry failures are stored in
/// the report). Returns [`CopyTreeError`] only for setup failures.
pub fn copy_tree<P, Q>(
    dir_source: P,
    dir_destination: Q,
    spec_tree_options: SpecTreeCopyOptions,
) -> Result<ReportCopy, CopyTreeError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_dir_src = dir_source.as_ref().to_path_buf();
    let path_dir_dst = dir_destination.as_ref().to_path_buf();

    for path in [&path_dir_src, &path_dir_dst] {
        if !path.is_absolute() {
            return Err(CopyTreeError::RelativePath(path.clone()));
        }
    }
    if !path_dir_src.is_dir() {
        return Err(CopyTreeError::SourceNotDirectory(path_dir_src));
    }
    if is_destination_inside_source(&path_dir_src, &path_dir_dst) {
        return Err(CopyTreeError::SourceDestinationOverlap {
            path_source: path_dir_src,
            path_destination: path_dir_dst,
        });
    }
    if fs::symlink_metadata(&path_dir_dst).is_ok_and(|m| m.file_type().is_symlink()) {
        return Err(CopyTreeError::DestinationIsSymlink(path_dir_dst));
    }
    fs::create_dir_all(&path_dir_dst).map_err(|e| CopyTreeError::DestinationInitFailed {
        path: path_dir_dst.clone(),
        message: e.to_string(),
    })?;

    let n_workers_max = calculate_worker_limit(spec_tree_options.num_workers_max);
    let mut spec_cp_ctx = SpecCopyContext {
        n_workers_max,
        builder_cp_report: ReportCopyBuilder::default(),
        l_tasks_file_copy: Vec::new(),
    };

    walk_directory(&path_dir_src, &path_dir_dst, &mut spec_cp_ctx);
    flush_file_copy_tasks(&mut spec_cp_ctx);
    Ok(spec_cp_ctx.builder_cp_report.build())
}

fn run_copy_task(spec_task: SpecCopyTaskFile) -> (PathBuf, Result<(), String>) {
    let res_copy = copy_file_with_metadata(&spec_task.path_file_src, &spec_task.path_file_dst)
        .map_err(|e| e.to_string());
    (spec_task.path_file_dst, res_copy)
}

fn flush_file_copy_tasks(spec_cp_ctx: &mut SpecCopyContext) {
    let l_tasks_file_copy = std::mem::take(&mut spec_cp_ctx.l_tasks_file_copy);
    if l_tasks_file_copy.is_empty() {
        return;
    }

    let l_results = if spec_cp_ctx.n_workers_max <= 1 {
        l_tasks_file_copy
            .into_iter()
            .map(run_copy_task)
            .collect::<Vec<_>>()
    } else {
        match ThreadPoolBuilder::new()
            .num_threads(spec_cp_ctx.n_workers_max)
            .build()
        {
            Ok(thread_pool) => thread_pool.install(|| {
                l_tasks_file_copy
                    .into_par_iter()
                    .map(run_copy_task)
                    .collect::<Vec<_>>()
            }),
            Err(_) => {
                spec_cp_ctx.builder_cp_report.add_warning(format!(
                    "Failed to initialize thread pool (workers={}); fallback to serial copy.",
                    spec_cp_ctx.n_workers_max
                ));
                l_tasks_file_copy
                    .into_iter()
                    .map(run_copy_task)
                    .collect::<Vec<_>>()
            }
        }
    };

    for (path_file_dst, res_copy) in l_results {
        match res_copy {
            Ok(_) => spec_cp_ctx.builder_cp_report.add_copied(),
            Err(msg) => spec_cp_ctx.builder_cp_report.add_error(path_file_dst, msg),
        }
    }
}

fn walk_directory(path_dir_src: &Path, path_dir_dst: &Path, spec_cp_ctx: &mut SpecCopyContext) {
    let iter_entries = match fs::read_dir(path_dir_src) {
        Ok(iter) => iter,
        Err(e) => {
            spec_cp_ctx.builder_cp_report.add_error(
                path_dir_src.to_path_buf(),
                format!("Failed to read directory ({e})"),
            );
            return;
        }
    };

    let mut l_dirs: Vec<SpecTreeEntry> = Vec::new();
    let mut l_files: Vec<SpecTreeEntry> = Vec::new();
    for entry_res in iter_entries {
        let entry = match entry_res {
            Ok(v) => v,
            Err(e) => {
                spec_cp_ctx.builder_cp_report.add_warning(format!(
                    "Failed to read directory entry under {} ({e})",
                    path_dir_src.display()
                ));
                continue;
            }
        };

        let path_entry = entry.path();
        let cfg_file_type = match entry.file_type() {
            Ok(v) => v,
            Err(e) => {
                spec_cp_ctx
                    .builder_cp_report
                    .add_warning(format!("Failed to inspect {} ({e})", path_entry.display()));
                continue;
            }
        };
        spec_cp_ctx.builder_cp_report.add_scanned();

        let spec_entry = SpecTreeEntry {
            name_entry: entry.file_name().to_string_lossy().to_string(),
            if_is_symlink: cfg_file_type.is_symlink(),
            path_src: path_entry,
        };
        if cfg_file_type.is_dir() {
            l_dirs.push(spec_entry);
        } else if cfg_file_type.is_file() || spec_entry.if_is_symlink {
            l_files.push(spec_entry);
        } else {
            spec_cp_ctx.builder_cp_report.add_warning(format!(
                "Special file skipped: {}",
                spec_entry.path_src.display()
            ));
            spec_cp_ctx.builder_cp_report.add_skipped();
        }
    }

    l_dirs.sort_by(|a, b| a.name_entry.cmp(&b.name_entry));
    l_files.sort_by(|a, b| a.name_entry.cmp(&b.name_entry));

    for spec_dir_entry in l_dirs {
        let path_dir_dst_sub = path_dir_dst.join(&spec_dir_entry.name_entry);
        if handle_dir_entry(&path_dir_dst_sub, spec_cp_ctx) {
            walk_directory(&spec_dir_entry.path_src, &path_dir_dst_sub, spec_cp_ctx);
        }
    }

    for spec_file_entry in l_files {
        let path_file_dst = path_dir_dst.join(&spec_file_entry.name_entry);
        handle_file_entry(spec_file_entry, path_file_dst, spec_cp_ctx);
    }
}

/// Prepare one destination directory; `true` means descend into it.
fn handle_dir_entry(path_dir_dst_sub: &Path, spec_cp_ctx: &mut SpecCopyContext) -> bool {
    if should_skip_dir_conflict(path_dir_dst_sub, &mut spec_cp_ctx.builder_cp_report) {
        return false;
    }
    if path_dir_dst_sub.is_dir() {
        return true;
    }
    match fs::create_dir(path_dir_dst_sub) {
        Ok(_) => {
            spec_cp_ctx.builder_cp_report.add_copied();
            true
        }
        Err(e) => {
            spec_cp_ctx
                .builder_cp_report
                .add_error(path_dir_dst_sub.to_path_buf(), e.to_string());
            false
        }
    }
}

fn handle_file_entry(
    spec_file_entry: SpecTreeEntry,
    path_file_dst: PathBuf,
    spec_cp_ctx: &mut SpecCopyContext,
) {
    if should_skip_file_conflict(&path_file_dst, &mut spec_cp_ctx.builder_cp_report) {
        return;
    }

    if spec_file_entry.if_is_symlink {
        create_symbolic_link(
            &spec_file_entry.path_src,
            &path_file_dst,
            &mut spec_cp_ctx.builder_cp_report,
        );
        return;
    }

    spec_cp_ctx.l_tasks_file_copy.push(SpecCopyTaskFile {
        path_file_src: spec_file_entry.path_src,
        path_file_dst,
    });
}
