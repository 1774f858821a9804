// Compiles the GLSL sources in assets/shaders to SPIR-V next to them.
// Needs glslc from the Vulkan SDK; set SKIP_SHADERS to skip.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

const SHADER_DIR: &str = "assets/shaders";
const STAGES: [&str; 2] = ["vert", "frag"];

fn main() {
    println!("cargo:rerun-if-changed={SHADER_DIR}");
    println!("cargo:rerun-if-env-changed=VULKAN_SDK");
    println!("cargo:rerun-if-env-changed=SKIP_SHADERS");

    if env::var("SKIP_SHADERS").is_ok() {
        println!("cargo:warning=Skipping shader compilation (SKIP_SHADERS set)");
        return;
    }

    let Ok(vulkan_sdk) = env::var("VULKAN_SDK") else {
        println!("cargo:warning=VULKAN_SDK not set, shader compilation skipped");
        return;
    };
    let glslc = if cfg!(target_os = "windows") {
        PathBuf::from(&vulkan_sdk).join("Bin").join("glslc.exe")
    } else {
        PathBuf::from(&vulkan_sdk).join("bin").join("glslc")
    };
    if !glslc.exists() {
        panic!("glslc not found at {}", glslc.display());
    }

    let entries = match std::fs::read_dir(SHADER_DIR) {
        Ok(entries) => entries,
        Err(e) => {
            println!("cargo:warning=Cannot read {SHADER_DIR}: {e}");
            return;
        }
    };

    for path in entries.filter_map(Result::ok).map(|entry| entry.path()) {
        let is_stage = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| STAGES.contains(&ext));
        if !is_stage {
            continue;
        }

        let mut output = path.clone().into_os_string();
        output.push(".spv");
        let output = PathBuf::from(output);
        if is_up_to_date(&path, &output) {
            continue;
        }

        let status = Command::new(&glslc).arg(&path).arg("-o").arg(&output).status();
        match status {
            Ok(status) if status.success() => {}
            Ok(status) => panic!("glslc failed for {} with {status}", path.display()),
            Err(e) => panic!("failed to run glslc for {}: {e}", path.display()),
        }
    }
}

fn is_up_to_date(source: &Path, output: &Path) -> bool {
    let modified = |path: &Path| std::fs::metadata(path).and_then(|meta| meta.modified()).ok();
    match (modified(source), modified(output)) {
        (Some(source), Some(output)) => output >= source,
        _ => false,
    }
}
