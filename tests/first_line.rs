use poem_generator::candidates::{PoemLine, PoemLineList};
use poem_generator::common::punctuation::remove_punct;
use poem_generator::first_line::{
    filter_candidates, FirstLineConfig, FirstLineGenerator, GeneratorSettings, SourceEncoding,
    SpecialTokenIds,
};
use poem_generator::{Config, PoemGeneratorError};
use rust_bert::resources::LocalResource;
use safetensors::tensor::TensorView;
use safetensors::Dtype;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tch::Device;

#[test]
fn filter_drops_punctuation_only_candidates() {
    let candidates = [
        "Kuu nousee",
        "...",
        "« — »",
        "Kuu nousee",
        "?!",
        "Hiljaa, hiljaa.",
        "",
    ];
    let filtered = filter_candidates(candidates);

    for candidate in &filtered {
        assert!(!remove_punct(candidate).trim().is_empty());
    }
    let unique: HashSet<&String> = filtered.iter().collect();
    assert_eq!(unique.len(), filtered.len());
    assert_eq!(filtered, vec!["Kuu nousee", "Hiljaa, hiljaa."]);
}

#[test]
fn filter_scenarios() {
    let filtered = filter_candidates(["...", "kissa istuu", "kissa istuu", "??"]);
    let filtered: HashSet<String> = filtered.into_iter().collect();
    assert_eq!(filtered, HashSet::from(["kissa istuu".to_string()]));

    assert!(filter_candidates(Vec::<&str>::new()).is_empty());
    assert!(filter_candidates(["!!!", "...", "??"]).is_empty());
}

#[test]
fn filter_then_collect_into_lines() {
    let lines: PoemLineList = filter_candidates(["tuuli", "tuuli", "…", "aalto"])
        .into_iter()
        .map(PoemLine::new)
        .collect();
    assert_eq!(lines.texts(), vec!["tuuli", "aalto"]);

    let again: PoemLineList = filter_candidates(lines.texts())
        .into_iter()
        .map(PoemLine::new)
        .collect();
    assert_eq!(again, lines);
}

#[test]
fn keyword_encoding_is_fixed_length() {
    let special = SpecialTokenIds {
        unk: 3,
        eos: 2,
        pad: 1,
        language_code: 250007,
    };
    for length in [0, 1, 5, 29, 30, 31, 64, 500] {
        let token_ids: Vec<i64> = (1000..1000 + length).collect();
        let encoding = SourceEncoding::new(&token_ids, &special, 250027, 32);
        assert_eq!(encoding.input_ids.len(), 32);
        assert_eq!(encoding.attention_mask.len(), 32);

        let used = encoding.attention_mask.iter().filter(|&&mask| mask == 1).count();
        assert_eq!(used, (length as usize).min(30) + 2);
        assert_eq!(encoding.input_ids[used - 2], 2);
        assert_eq!(encoding.input_ids[used - 1], 250007);
        assert!(encoding.input_ids[used..].iter().all(|&id| id == 1));
    }
}

#[test]
fn settings_file_builds_cpu_config() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{
            "checkpoint_path": "models/first-line-fi-20-epochs/rust_model.safetensors",
            "device": "cpu",
            "num_return_sequences": 3,
            "num_beams": 3
        }"#,
    )?;
    let settings = GeneratorSettings::from_file(&path)?;
    let config = settings.into_config();
    assert_eq!(config.device, Device::Cpu);
    assert_eq!(config.num_return_sequences, 3);
    assert_eq!(config.max_source_length, 32);
    assert!(config.validate().is_ok());
    Ok(())
}

fn model_config(vocab_size: usize) -> String {
    format!(
        r#"{{
            "vocab_size": {},
            "max_position_embeddings": 1024,
            "encoder_layers": 2,
            "encoder_attention_heads": 2,
            "encoder_ffn_dim": 16,
            "encoder_layerdrop": 0.0,
            "decoder_layers": 2,
            "decoder_ffn_dim": 16,
            "decoder_attention_heads": 2,
            "decoder_layerdrop": 0.0,
            "d_model": 8,
            "dropout": 0.1,
            "activation_dropout": 0.0,
            "attention_dropout": 0.0,
            "init_std": 0.02,
            "decoder_start_token_id": 250007
        }}"#,
        vocab_size
    )
}

fn embedding_checkpoint(path: &Path, rows: usize) -> anyhow::Result<()> {
    let data = vec![0u8; rows * 8 * 4];
    let embedding = TensorView::new(Dtype::F32, vec![rows, 8], &data)?;
    std::fs::write(
        path,
        safetensors::serialize([("model.shared.weight", embedding)], &None)?,
    )?;
    Ok(())
}

fn local_config(dir: &Path, config_path: PathBuf, checkpoint_path: PathBuf) -> FirstLineConfig {
    FirstLineConfig {
        config_resource: Box::new(LocalResource {
            local_path: config_path,
        }),
        vocab_resource: Box::new(LocalResource {
            local_path: dir.join("sentencepiece.bpe.model"),
        }),
        checkpoint_resource: Box::new(LocalResource {
            local_path: checkpoint_path,
        }),
        device: Device::Cpu,
        ..Default::default()
    }
}

#[test]
fn mismatched_checkpoint_is_a_load_failure() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("config.json");
    std::fs::write(&config_path, model_config(40))?;
    let checkpoint_path = dir.path().join("model.safetensors");
    embedding_checkpoint(&checkpoint_path, 54)?;

    let result = FirstLineGenerator::new(local_config(dir.path(), config_path, checkpoint_path));
    assert!(matches!(
        result,
        Err(PoemGeneratorError::LoadFailure(message)) if message.contains("embedding rows")
    ));
    Ok(())
}

#[test]
fn incomplete_model_configuration_is_a_load_failure() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("config.json");
    std::fs::write(&config_path, r#"{"vocab_size": 40}"#)?;
    let checkpoint_path = dir.path().join("model.safetensors");
    embedding_checkpoint(&checkpoint_path, 40)?;

    let result = FirstLineGenerator::new(local_config(dir.path(), config_path, checkpoint_path));
    assert!(matches!(
        result,
        Err(PoemGeneratorError::LoadFailure(message)) if message.contains("missing field")
    ));
    Ok(())
}

#[test]
fn missing_tokenizer_after_valid_checkpoint_is_a_load_failure() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("config.json");
    std::fs::write(&config_path, model_config(40))?;
    let checkpoint_path = dir.path().join("model.safetensors");
    embedding_checkpoint(&checkpoint_path, 40)?;

    let result = FirstLineGenerator::new(local_config(dir.path(), config_path, checkpoint_path));
    assert!(matches!(
        result,
        Err(PoemGeneratorError::LoadFailure(message)) if message.contains("tokenizer")
    ));
    Ok(())
}

fn checkpoint_from_env() -> PathBuf {
    PathBuf::from(
        std::env::var("POEM_GENERATOR_CHECKPOINT")
            .unwrap_or_else(|_| "models/first-line-fi-20-epochs/rust_model.ot".to_string()),
    )
}

#[test]
#[cfg_attr(not(feature = "all-tests"), ignore)]
fn first_line_generation() -> anyhow::Result<()> {
    let config = FirstLineConfig {
        checkpoint_resource: Box::new(LocalResource {
            local_path: checkpoint_from_env(),
        }),
        device: Device::Cpu,
        ..Default::default()
    };
    let generator = FirstLineGenerator::new(config)?;
    assert!(generator.decoder_start_token_id() > 250000);
    assert!(generator.decoder_start_token_id() < generator.vocab_size());

    let lines = generator.generate("kissa ikkuna ilta")?;
    assert!(lines.len() <= 5);
    let unique: HashSet<&str> = lines.texts().into_iter().collect();
    assert_eq!(unique.len(), lines.len());
    for line in &lines {
        assert!(!remove_punct(&line.text).trim().is_empty());
    }

    let long_keywords = "meri ".repeat(200);
    let lines = generator.generate(&long_keywords)?;
    assert!(lines.len() <= 5);
    Ok(())
}
