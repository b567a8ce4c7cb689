//! Unit tests for the SPIR-V reader

use crate::spirv::SpirvFile;
use glyphterm_engine::Error;
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("glyphterm_spirv_{}_{}", std::process::id(), name))
}

#[test]
fn test_missing_file_is_shader_not_found() {
    let err = SpirvFile::open(&temp_path("does_not_exist.spv")).unwrap_err();
    assert!(matches!(err, Error::ShaderNotFound(_)));
}

#[test]
fn test_words_round_trip() {
    let path = temp_path("valid.spv");
    let words: Vec<u32> = vec![0x0723_0203, 0x0001_0000, 42];
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_ne_bytes()).collect();
    std::fs::write(&path, &bytes).unwrap();

    let spirv = SpirvFile::open(&path).unwrap();
    assert_eq!(spirv.word_count(), 3);
    assert_eq!(spirv.words().unwrap(), &words[..]);

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_truncated_binary_is_rejected() {
    let path = temp_path("truncated.spv");
    std::fs::write(&path, [1u8, 2, 3]).unwrap();

    assert!(SpirvFile::open(&path).is_err());

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_empty_binary_is_rejected() {
    let path = temp_path("empty.spv");
    std::fs::write(&path, []).unwrap();

    assert!(SpirvFile::open(&path).is_err());

    std::fs::remove_file(&path).ok();
}
