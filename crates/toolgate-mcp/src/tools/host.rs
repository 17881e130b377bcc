//! Host and system status tools
//!
//! sysinfo probes block (the CPU sample sleeps between two refreshes), so
//! each one runs on the blocking pool.

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use sysinfo::{Disks, ProcessesToUpdate, System};
use toolgate_core::{ParamKind, ParamSpec, ToolArgs, ToolDescriptor, ToolError};

const TOP_PROCESSES: usize = 10;

async fn blocking<F>(probe: F) -> Result<Value, ToolError>
where
    F: FnOnce() -> Result<Value, ToolError> + Send + 'static,
{
    tokio::task::spawn_blocking(probe)
        .await
        .map_err(|e| ToolError::Failed(format!("host probe aborted: {}", e)))?
}

/// Percentage rounded to one decimal place
fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 1000.0).round() / 10.0
}

fn os_name() -> Value {
    json!({
        "hostname": System::host_name().unwrap_or_default(),
        "os": System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string()),
        "kernel": System::kernel_version().unwrap_or_default(),
        "arch": std::env::consts::ARCH,
    })
}

fn system_resources() -> Value {
    let mut sys = System::new();
    sys.refresh_cpu_usage();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu_usage();
    sys.refresh_memory();

    let total = sys.total_memory();
    let used = sys.used_memory();
    let load = System::load_average();

    json!({
        "cpu_percent": sys.global_cpu_usage(),
        "memory": {
            "total": total,
            "used": used,
            "percent": percent(used, total),
        },
        "loadavg": [load.one, load.five, load.fifteen],
    })
}

/// Mount point with the longest prefix of `path`
fn find_mount<'a>(path: &Path, mounts: impl IntoIterator<Item = &'a Path>) -> Option<&'a Path> {
    mounts
        .into_iter()
        .filter(|mount| path.starts_with(mount))
        .max_by_key(|mount| mount.components().count())
}

struct DiskUsage {
    mount_point: PathBuf,
    total: u64,
    free: u64,
}

impl DiskUsage {
    fn used(&self) -> u64 {
        self.total.saturating_sub(self.free)
    }

    fn percent(&self) -> f64 {
        percent(self.used(), self.total)
    }
}

fn disk_usage(path: &str) -> Result<DiskUsage, ToolError> {
    let resolved = Path::new(path)
        .canonicalize()
        .map_err(|e| ToolError::Failed(format!("{}: {}", path, e)))?;

    let disks = Disks::new_with_refreshed_list();
    let mount = find_mount(&resolved, disks.list().iter().map(|d| d.mount_point()))
        .ok_or_else(|| ToolError::Failed(format!("No mounted disk found for {}", path)))?;

    let disk = disks
        .list()
        .iter()
        .find(|d| d.mount_point() == mount)
        .ok_or_else(|| ToolError::Failed(format!("No mounted disk found for {}", path)))?;

    Ok(DiskUsage {
        mount_point: mount.to_path_buf(),
        total: disk.total_space(),
        free: disk.available_space(),
    })
}

fn disk_warning(path: &str, percent: f64, threshold: f64) -> String {
    if percent < threshold {
        String::new()
    } else {
        format!("WARNING: Disk {} is {}% full!", path, percent)
    }
}

fn process_info() -> Value {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.refresh_processes(ProcessesToUpdate::All, true);

    let total = sys.total_memory();
    let mut processes: Vec<_> = sys.processes().iter().collect();
    processes.sort_by(|a, b| b.1.memory().cmp(&a.1.memory()));

    let top: Vec<Value> = processes
        .into_iter()
        .take(TOP_PROCESSES)
        .map(|(pid, p)| {
            json!({
                "pid": pid.as_u32(),
                "name": p.name().to_string_lossy(),
                "memory_percent": percent(p.memory(), total),
            })
        })
        .collect();

    json!({ "processes": top })
}

fn path_param() -> ParamSpec {
    ParamSpec::optional("path", ParamKind::String, "/", "Filesystem path to inspect")
}

pub fn os_name_tool() -> ToolDescriptor {
    ToolDescriptor::from_fn(
        "get_os_name",
        "Get OS and platform information",
        vec![],
        |_args: ToolArgs| blocking(|| Ok(os_name())),
    )
}

pub fn system_resources_tool() -> ToolDescriptor {
    ToolDescriptor::from_fn(
        "get_system_resources",
        "Get CPU, memory, and load information",
        vec![],
        |_args: ToolArgs| blocking(|| Ok(system_resources())),
    )
}

pub fn disk_usage_tool() -> ToolDescriptor {
    ToolDescriptor::from_fn(
        "get_disk_usage",
        "Get disk usage for a path",
        vec![path_param()],
        |args: ToolArgs| async move {
            let path = args.require_str("path")?.to_string();
            blocking(move || {
                let usage = disk_usage(&path)?;
                Ok(json!({
                    "path": path,
                    "mount_point": usage.mount_point,
                    "total": usage.total,
                    "used": usage.used(),
                    "free": usage.free,
                    "percent": usage.percent(),
                }))
            })
            .await
        },
    )
}

pub fn disk_warning_tool(threshold: f64) -> ToolDescriptor {
    ToolDescriptor::from_fn(
        "check_disk_space_warning",
        "Check disk space and return a warning if usage is high",
        vec![path_param()],
        move |args: ToolArgs| async move {
            let path = args.require_str("path")?.to_string();
            blocking(move || {
                let percent = disk_usage(&path)?.percent();
                Ok(json!({
                    "path": path,
                    "percent": percent,
                    "warning": disk_warning(&path, percent, threshold),
                }))
            })
            .await
        },
    )
}

pub fn process_info_tool() -> ToolDescriptor {
    ToolDescriptor::from_fn(
        "get_process_info",
        "Get the running processes using the most memory",
        vec![],
        |_args: ToolArgs| blocking(|| Ok(process_info())),
    )
}
