use std::fs::File;
use std::path::{Path, PathBuf};

use tempfile::tempdir;

use shardpack::transport::tar::read_all_records;
use shardpack::{
    CollisionPolicy, MergeMode, PackConfig, Record, RepackError, SplitLabel, pipeline,
};

fn write_archive(path: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).unwrap();
    let mut builder = tar::Builder::new(file);
    for (name, payload) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(payload.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        builder.append_data(&mut header, name, *payload).unwrap();
    }
    builder.finish().unwrap();
}

fn write_metadata(path: &Path, pairs: &[(&str, &str)]) {
    let mut body = serde_json::Map::new();
    for (key, category) in pairs {
        body.insert(
            key.to_string(),
            serde_json::json!({ "category": category }),
        );
    }
    std::fs::write(path, serde_json::to_string_pretty(&body).unwrap()).unwrap();
}

fn config(mode: MergeMode, root: &Path) -> PackConfig {
    PackConfig::new(mode, root.join("metadata.json"), root.join("dataset"))
}

/// Records from every shard of one split, by sequence number then write order.
fn split_records(out_root: &Path, split: SplitLabel) -> Vec<Record> {
    let split_dir = out_root.join(split.as_str());
    let mut shards: Vec<PathBuf> = std::fs::read_dir(&split_dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    shards.sort();
    shards
        .iter()
        .flat_map(|shard| read_all_records(shard).unwrap())
        .collect()
}

#[test]
fn join_merges_three_keys_in_feature_order() {
    let temp = tempdir().unwrap();
    let root = temp.path();

    write_archive(
        &root.join("features.tar"),
        &[
            ("000001.embedding.pyd", b"emb-1"),
            ("000002.embedding.pyd", b"emb-2"),
            ("000003.embedding.pyd", b"emb-3"),
        ],
    );
    write_archive(
        &root.join("part-a.tar"),
        &[("000001.image.png", b"a-1"), ("000003.image.png", b"a-3")],
    );
    write_archive(&root.join("part-b.tar"), &[("000002.image.png", b"b-2")]);
    write_metadata(
        &root.join("metadata.json"),
        &[("000001", "train"), ("000002", "train"), ("000003", "train")],
    );

    let mut config = config(MergeMode::Join, root);
    config.features = Some(root.join("features.tar"));
    config.partitions = vec![root.join("part-a.tar"), root.join("part-b.tar")];

    let report = pipeline::run(&config).unwrap();
    assert_eq!(report.records, 3);

    let train = split_records(&config.out_root, SplitLabel::Train);
    let keys: Vec<&str> = train.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["000001", "000002", "000003"]);
    assert_eq!(train[0].fields["image.png"], b"a-1");
    assert_eq!(train[1].fields["image.png"], b"b-2");
    assert_eq!(train[2].fields["image.png"], b"a-3");
    for record in &train {
        assert!(record.fields.contains_key("embedding.pyd"));
    }
    assert!(split_records(&config.out_root, SplitLabel::Val).is_empty());
}

#[test]
fn ordered_merge_emits_global_key_order() {
    let temp = tempdir().unwrap();
    let root = temp.path();

    write_archive(
        &root.join("part-a.tar"),
        &[("000002.image.png", b"a-2"), ("000005.image.png", b"a-5")],
    );
    write_archive(
        &root.join("part-b.tar"),
        &[("000001.image.png", b"b-1"), ("000003.image.png", b"b-3")],
    );
    write_metadata(
        &root.join("metadata.json"),
        &[
            ("000001", "train"),
            ("000002", "train"),
            ("000003", "train"),
            ("000005", "train"),
        ],
    );

    let mut config = config(MergeMode::Ordered, root);
    config.partitions = vec![root.join("part-a.tar"), root.join("part-b.tar")];

    let report = pipeline::run(&config).unwrap();
    assert_eq!(report.records, 4);

    let train = split_records(&config.out_root, SplitLabel::Train);
    let keys: Vec<&str> = train.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["000001", "000002", "000003", "000005"]);
}

#[test]
fn record_ceiling_produces_shards_of_two_two_one() {
    let temp = tempdir().unwrap();
    let root = temp.path();

    let entries: Vec<(String, Vec<u8>)> = (1..=5)
        .map(|idx| (format!("{idx:06}.image.png"), vec![idx as u8; 64]))
        .collect();
    let borrowed: Vec<(&str, &[u8])> = entries
        .iter()
        .map(|(name, payload)| (name.as_str(), payload.as_slice()))
        .collect();
    write_archive(&root.join("part-a.tar"), &borrowed);
    let assignments: Vec<(String, &str)> =
        (1..=5).map(|idx| (format!("{idx:06}"), "train")).collect();
    let pairs: Vec<(&str, &str)> = assignments
        .iter()
        .map(|(key, category)| (key.as_str(), *category))
        .collect();
    write_metadata(&root.join("metadata.json"), &pairs);

    let mut config = config(MergeMode::Ordered, root);
    config.partitions = vec![root.join("part-a.tar")];
    config.max_shard_records = 2;

    let report = pipeline::run(&config).unwrap();
    assert_eq!(report.records, 5);

    let train_layout = report
        .layouts
        .iter()
        .find(|layout| layout.split == SplitLabel::Train)
        .unwrap();
    let counts: Vec<u64> = train_layout.shards.iter().map(|s| s.records).collect();
    assert_eq!(counts, vec![2, 2, 1]);
    let names: Vec<String> = train_layout
        .shards
        .iter()
        .map(|s| s.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["out-000000.tar", "out-000001.tar", "out-000002.tar"]
    );
}

#[test]
fn split_round_trip_reproduces_the_merge_stream() {
    let temp = tempdir().unwrap();
    let root = temp.path();

    write_archive(
        &root.join("part-a.tar"),
        &[
            ("000001.image.png", b"p-1"),
            ("000004.image.png", b"p-4"),
            ("000006.image.png", b"p-6"),
        ],
    );
    write_archive(
        &root.join("part-b.tar"),
        &[("000002.image.png", b"p-2"), ("000005.image.png", b"p-5")],
    );
    write_metadata(
        &root.join("metadata.json"),
        &[
            ("000001", "train"),
            ("000002", "val"),
            ("000004", "val"),
            ("000005", "train"),
            ("000006", "train"),
        ],
    );

    let mut config = config(MergeMode::Ordered, root);
    config.partitions = vec![root.join("part-a.tar"), root.join("part-b.tar")];
    config.max_shard_records = 2;

    let report = pipeline::run(&config).unwrap();
    assert_eq!(report.records, 5);

    let train = split_records(&config.out_root, SplitLabel::Train);
    let val = split_records(&config.out_root, SplitLabel::Val);
    let train_keys: Vec<&str> = train.iter().map(|r| r.key.as_str()).collect();
    let val_keys: Vec<&str> = val.iter().map(|r| r.key.as_str()).collect();

    // Per-split streams are the merge output filtered to that split, with no
    // record dropped, duplicated, or reordered.
    assert_eq!(train_keys, vec!["000001", "000005", "000006"]);
    assert_eq!(val_keys, vec!["000002", "000004"]);
    assert_eq!(train[1].fields["image.png"], b"p-5");
    assert_eq!(val[0].fields["image.png"], b"p-2");
}

#[test]
fn join_aborts_when_a_key_matches_no_partition() {
    let temp = tempdir().unwrap();
    let root = temp.path();

    write_archive(
        &root.join("features.tar"),
        &[
            ("000001.embedding.pyd", b"emb-1"),
            ("000002.embedding.pyd", b"emb-2"),
        ],
    );
    write_archive(&root.join("part-a.tar"), &[("000001.image.png", b"a-1")]);
    write_metadata(
        &root.join("metadata.json"),
        &[("000001", "train"), ("000002", "train")],
    );

    let mut config = config(MergeMode::Join, root);
    config.features = Some(root.join("features.tar"));
    config.partitions = vec![root.join("part-a.tar")];

    let err = pipeline::run(&config).unwrap_err();
    assert!(matches!(
        err,
        RepackError::MatchCount { ref key, matches: 0 } if key == "000002"
    ));
}

#[test]
fn join_aborts_on_residual_partition_records() {
    let temp = tempdir().unwrap();
    let root = temp.path();

    write_archive(
        &root.join("features.tar"),
        &[("000001.embedding.pyd", b"emb-1")],
    );
    write_archive(
        &root.join("part-a.tar"),
        &[("000001.image.png", b"a-1"), ("000009.image.png", b"a-9")],
    );
    write_metadata(&root.join("metadata.json"), &[("000001", "train")]);

    let mut config = config(MergeMode::Join, root);
    config.features = Some(root.join("features.tar"));
    config.partitions = vec![root.join("part-a.tar")];

    let err = pipeline::run(&config).unwrap_err();
    assert!(matches!(
        err,
        RepackError::ResidualPartition { ref archive, ref key }
            if archive == "part-a" && key == "000009"
    ));
}

#[test]
fn missing_split_assignment_aborts_the_run() {
    let temp = tempdir().unwrap();
    let root = temp.path();

    write_archive(&root.join("part-a.tar"), &[("000001.image.png", b"a-1")]);
    write_metadata(&root.join("metadata.json"), &[("999999", "train")]);

    let mut config = config(MergeMode::Ordered, root);
    config.partitions = vec![root.join("part-a.tar")];

    let err = pipeline::run(&config).unwrap_err();
    assert!(matches!(
        err,
        RepackError::MissingSplit { ref key } if key == "000001"
    ));
}

#[test]
fn unrecognized_split_label_aborts_before_output_is_created() {
    let temp = tempdir().unwrap();
    let root = temp.path();

    write_archive(&root.join("part-a.tar"), &[("000001.image.png", b"a-1")]);
    write_metadata(&root.join("metadata.json"), &[("000001", "holdout")]);

    let mut config = config(MergeMode::Ordered, root);
    config.partitions = vec![root.join("part-a.tar")];

    let err = pipeline::run(&config).unwrap_err();
    assert!(matches!(err, RepackError::Configuration(_)));
    assert!(!config.out_root.exists());
}

#[test]
fn join_collision_policy_is_honored_end_to_end() {
    let temp = tempdir().unwrap();
    let root = temp.path();

    write_archive(&root.join("features.tar"), &[("000001.image.png", b"feat")]);
    write_archive(&root.join("part-a.tar"), &[("000001.image.png", b"part")]);
    write_metadata(&root.join("metadata.json"), &[("000001", "train")]);

    let mut config = config(MergeMode::Join, root);
    config.features = Some(root.join("features.tar"));
    config.partitions = vec![root.join("part-a.tar")];

    let err = pipeline::run(&config).unwrap_err();
    assert!(matches!(err, RepackError::FieldCollision { ref field, .. } if field == "image.png"));

    config.out_root = root.join("dataset-overwrite");
    config.collision = CollisionPolicy::Overwrite;
    let report = pipeline::run(&config).unwrap();
    assert_eq!(report.records, 1);
    let train = split_records(&config.out_root, SplitLabel::Train);
    assert_eq!(train[0].fields["image.png"], b"part");
}
