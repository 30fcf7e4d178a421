#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Write a JSON document into `dir`
pub fn write_document(dir: &Path, name: &str, tree: &Value) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(tree).unwrap()).unwrap();
    path
}

/// Write raw text into `dir`
pub fn write_raw(dir: &Path, name: &str, contents: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// Sorted names of the files left in `dir`
pub fn remaining_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// A generation workflow snapshot in the shape image metadata is exported with:
/// the editor graph under `workflow` and the executed prompt under `prompt`.
pub fn sampler_workflow(seed: u64, control: &str, prompt: &str, node_counter: u64) -> Value {
    json!({
        "workflow": {
            "last_node_id": node_counter,
            "last_link_id": node_counter,
            "nodes": [
                {
                    "id": 3,
                    "type": "KSampler",
                    "widgets_values": [seed, control, 20, 8, "euler", "normal", 1]
                },
                {
                    "id": 6,
                    "type": "CLIPTextEncode",
                    "widgets_values": [prompt]
                }
            ],
            "links": [[1, 4, 0, 3, 0, "MODEL"]],
            "extra": {"ds": {"scale": 1.0}},
            "version": 0.4
        },
        "prompt": {
            "3": {
                "class_type": "KSampler",
                "inputs": {"seed": seed, "steps": 20, "control_after_generate": control}
            },
            "6": {
                "class_type": "CLIPTextEncode",
                "inputs": {"text": prompt}
            }
        }
    })
}
