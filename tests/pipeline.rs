mod common;

use common::{Scratch, read_lines};

use nanospec::app::pipeline::{TargetSource, run_grid, run_import, run_lookup, run_stream};
use nanospec::data::{SplitConfig, SplitSource, add_ratio_columns};
use nanospec::domain::{
    AxisBounds, ColumnRange, Decimation, GeometryLayout, GeometryRecord, LookupConfig, ParameterBounds,
    ReadWindow, Spacing, TargetSpectrum, WriteMode,
};
use nanospec::error::{AppError, ErrorKind};
use nanospec::grid::GridOptions;
use nanospec::infer::{InferenceOutput, ModelConfig, SpectrumModel, run_inference, run_inference_with};
use nanospec::io::dataset::ImportOptions;
use nanospec::io::export::write_candidates_csv;
use nanospec::io::geometry::stream_geometries;
use nanospec::io::manifest::read_manifest;

/// h1 and h2 take {0, 1}; every other axis is pinned at 0.
fn two_by_two() -> (ParameterBounds, Spacing) {
    let mut axes = vec![AxisBounds::new(0.0, 2.0); 2];
    axes.extend(std::iter::repeat_n(AxisBounds::new(0.0, 1.0), 6));
    (
        ParameterBounds::from_values(&axes).unwrap(),
        Spacing::uniform(1.0).unwrap(),
    )
}

fn truncate_opts() -> GridOptions {
    GridOptions {
        mode: WriteMode::Truncate,
        cancel: None,
    }
}

/// Spectrum `[h1, h2, h1 + h2, 0]`.
struct ToyModel;

impl SpectrumModel for ToyModel {
    fn output_len(&self) -> usize {
        4
    }

    fn predict(&mut self, batch: &[GeometryRecord]) -> Result<Vec<Vec<f64>>, AppError> {
        Ok(batch
            .iter()
            .map(|g| {
                let h = g.heights();
                vec![h[0], h[1], h[0] + h[1], 0.0]
            })
            .collect())
    }
}

#[test]
fn uniform_grid_has_256_records() {
    let dir = Scratch::new("grid256");
    let bounds = ParameterBounds::uniform(0.0, 2.0).unwrap();
    let spacing = Spacing::uniform(1.0).unwrap();

    let run = run_grid(&bounds, &spacing, dir.path(), &truncate_opts(), false).unwrap();
    assert_eq!(run.summary.path, dir.join("grid.csv"));
    assert_eq!(run.summary.records, 256);
    assert!(run.manifest.is_none());

    let lines = read_lines(&run.summary.path);
    assert_eq!(lines.len(), 256);
    assert_eq!(lines[0], "0.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0");
    assert_eq!(lines[1], "0.0,0.0,0.0,0.0,0.0,0.0,0.0,1.0");
    assert_eq!(lines[255], "1.0,1.0,1.0,1.0,1.0,1.0,1.0,1.0");
}

#[test]
fn small_grid_writes_four_records_and_manifest() {
    let dir = Scratch::new("grid4");
    let (bounds, spacing) = two_by_two();
    let out = dir.join("lattice.csv");

    let run = run_grid(&bounds, &spacing, &out, &truncate_opts(), true).unwrap();
    let lines = read_lines(&out);
    assert_eq!(lines.len(), 4);
    for line in &lines {
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), 8);
        assert!(fields.iter().all(|f| f.split_once('.').is_some_and(|(_, d)| d.len() == 1)));
    }
    assert_eq!(lines[2], "1.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0");

    let manifest_path = run.manifest.unwrap();
    assert_eq!(manifest_path, dir.join("lattice.json"));
    let manifest = read_manifest(&manifest_path).unwrap();
    assert_eq!(manifest.records, 4);
    assert_eq!(manifest.mode, WriteMode::Truncate);
    assert_eq!(manifest.axes[0].count, 2);
    assert_eq!(manifest.axes[7].count, 1);
}

#[test]
fn grid_appends_by_default() {
    let dir = Scratch::new("append");
    let (bounds, spacing) = two_by_two();
    let out = dir.join("grid.csv");

    run_grid(&bounds, &spacing, &out, &GridOptions::default(), false).unwrap();
    run_grid(&bounds, &spacing, &out, &GridOptions::default(), false).unwrap();
    assert_eq!(read_lines(&out).len(), 8);

    run_grid(&bounds, &spacing, &out, &truncate_opts(), false).unwrap();
    assert_eq!(read_lines(&out).len(), 4);
}

#[test]
fn invalid_bounds_are_rejected_before_writing() {
    let err = ParameterBounds::uniform(2.0, 2.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRange);
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn grid_round_trips_through_the_streamer() {
    let dir = Scratch::new("roundtrip");
    let (bounds, spacing) = two_by_two();
    let out = dir.join("grid.csv");
    run_grid(&bounds, &spacing, &out, &truncate_opts(), false).unwrap();

    let batches: Vec<Vec<GeometryRecord>> = stream_geometries(vec![out], GeometryLayout::BARE, 4)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(batches.len(), 1);
    let heights: Vec<[f64; 2]> = batches[0].iter().map(|g| [g.0[0], g.0[1]]).collect();
    assert_eq!(heights, vec![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]);
    assert!(batches[0].iter().all(|g| g.radii() == [0.0; 4]));
}

#[test]
fn stream_yields_floor_n_over_b_batches_across_files() {
    let dir = Scratch::new("stream");
    let row = "7,8,1,2,3,4,5,6,7,8\n";
    dir.write("inputs/b.csv", &row.repeat(3));
    dir.write("inputs/a.csv", &row.repeat(4));
    dir.write("inputs/notes.txt", "ignored\n");

    let run = run_stream(&[dir.join("inputs")], GeometryLayout::WITH_IDS, 3).unwrap();
    assert_eq!(run.files, vec![dir.join("inputs/a.csv"), dir.join("inputs/b.csv")]);
    assert_eq!(run.batches, 2);
    assert_eq!(run.records_read, 7);
    assert_eq!(run.first, Some(GeometryRecord([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0])));
}

#[test]
fn stream_reports_malformed_line() {
    let dir = Scratch::new("malformed");
    let path = dir.write("bad.csv", "0,0,1,2,3,4,5,6,7,8\n0,0,1,2,x,4,5,6,7,8\n");
    let err = run_stream(&[path], GeometryLayout::WITH_IDS, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedRecord);
    assert!(err.message().contains("line 2"));
}

fn dataset_row(id: usize) -> String {
    let geometry: Vec<String> = (0..8).map(|g| format!("{}", id * 10 + g)).collect();
    let labels: Vec<String> = (0..12).map(|l| format!("{}", id * 100 + l)).collect();
    format!("{id},0,{},{}\n", geometry.join(","), labels.join(","))
}

fn dataset_file(ids: std::ops::Range<usize>) -> String {
    let mut text = String::from("id,set,h1,h2,h3,h4,r1,r2,r3,r4");
    for l in 0..12 {
        text.push_str(&format!(",s{l}"));
    }
    text.push('\n');
    for id in ids {
        text.push_str(&dataset_row(id));
    }
    text
}

#[test]
fn import_decimates_and_splits() {
    let dir = Scratch::new("import");
    dir.write("train/b.csv", &dataset_file(6..10));
    dir.write("train/a.csv", &dataset_file(0..6));

    let config = SplitConfig {
        source: SplitSource::Fraction(0.8),
        batch_size: 4,
        shuffle_buffer: 3,
        seed: 7,
    };
    let run = run_import(
        &dir.join("train"),
        ColumnRange::new(2, 10).unwrap(),
        ColumnRange::new(10, 22).unwrap(),
        ImportOptions::default(),
        Some(Decimation { window: 12, stride: 3 }),
        &config,
    )
    .unwrap();

    assert_eq!(run.data.files, vec![dir.join("train/a.csv"), dir.join("train/b.csv")]);
    assert_eq!(run.data.rows_per_file, vec![6, 4]);
    assert_eq!(run.data.n_samples(), 10);
    assert_eq!(run.data.features.ncols(), 8);
    assert_eq!(run.data.labels.ncols(), 4);
    // Row for id 7: labels 700..711, every third kept.
    assert_eq!(run.data.labels[(7, 0)], 700.0);
    assert_eq!(run.data.labels[(7, 3)], 709.0);

    assert_eq!(run.splits.train_len(), 8);
    assert_eq!(run.splits.valid_len(), 2);

    let batches: Vec<_> = run.splits.train_batches().take(5).collect();
    assert_eq!(batches.len(), 5);
    for b in &batches {
        assert_eq!(b.features.nrows(), 4);
        assert_eq!(b.labels.nrows(), 4);
        assert_eq!(b.labels.ncols(), 4);
        // Features and labels stay paired through the shuffle.
        for r in 0..4 {
            let id = (b.features[(r, 0)] / 10.0).round();
            assert_eq!(b.labels[(r, 0)], id * 100.0);
        }
    }
    // Two validation rows, batch of four: nothing full to yield.
    assert_eq!(run.splits.valid_batches().count(), 0);
}

#[test]
fn import_eval_directory_decimates_to_training_width() {
    let dir = Scratch::new("import-eval");
    dir.write("train/a.csv", &dataset_file(0..8));
    dir.write("eval/a.csv", &dataset_file(20..24));

    let config = SplitConfig {
        source: SplitSource::EvalDirectory(dir.join("eval")),
        batch_size: 2,
        shuffle_buffer: 4,
        seed: 1,
    };
    let run = run_import(
        &dir.join("train"),
        ColumnRange::new(2, 10).unwrap(),
        ColumnRange::new(10, 22).unwrap(),
        ImportOptions::default(),
        Some(Decimation { window: 12, stride: 4 }),
        &config,
    )
    .unwrap();

    assert_eq!(run.splits.train_len(), 8);
    assert_eq!(run.splits.valid_len(), 4);
    let valid: Vec<_> = run.splits.valid_batches().collect();
    assert_eq!(valid.len(), 2);
    for b in &valid {
        assert_eq!(b.labels.ncols(), run.data.labels.ncols());
    }
    // id 20: labels 2000..2011, every fourth kept, in file order.
    assert_eq!(valid[0].labels[(0, 0)], 2000.0);
    assert_eq!(valid[0].labels[(0, 2)], 2008.0);
}

#[test]
fn import_of_empty_directory_fails() {
    let dir = Scratch::new("empty");
    let err = run_import(
        dir.path(),
        ColumnRange::new(2, 10).unwrap(),
        ColumnRange::new(10, 22).unwrap(),
        ImportOptions::default(),
        None,
        &SplitConfig::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyDataset);
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn grid_to_library_to_lookup() {
    let dir = Scratch::new("e2e");
    let (bounds, spacing) = two_by_two();
    let grid = dir.join("grid.csv");
    run_grid(&bounds, &spacing, &grid, &truncate_opts(), false).unwrap();

    let output = InferenceOutput::in_dir(dir.path());
    let stream = stream_geometries(vec![grid], GeometryLayout::BARE, 2).unwrap();
    let summary = run_inference(&mut ToyModel, stream, &output).unwrap();
    assert_eq!(summary.batches, 2);
    assert_eq!(summary.records, 4);
    assert_eq!(read_lines(&output.predictions).len(), 4);

    let target = TargetSource::Points(vec![(0, 1.0), (1, 0.0)]).load(4).unwrap();
    let config = LookupConfig {
        k: 2,
        window: ReadWindow::Unbounded,
    };
    let run = run_lookup(&target, &output.predictions, Some(&output.features), &config).unwrap();

    let records: Vec<usize> = run.result.candidates.iter().map(|c| c.record).collect();
    // Record 2 is exact; records 0 and 3 tie at 0.5 and the earlier wins.
    assert_eq!(records, vec![2, 0]);
    assert_eq!(run.result.candidates[0].score, 0.0);
    assert_eq!(run.result.candidates[1].score, 0.5);
    assert_eq!(run.result.records_scanned, 4);

    let geometries = run.geometries.unwrap();
    assert_eq!(geometries[0].heights(), [1.0, 0.0, 0.0, 0.0]);
    assert_eq!(geometries[1].heights(), [0.0, 0.0, 0.0, 0.0]);

    let export = dir.join("best.csv");
    write_candidates_csv(&export, &run.result.candidates, Some(geometries.as_slice())).unwrap();
    let lines = read_lines(&export);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with(",r4,s0,s1,s2,s3"));
    assert!(lines[1].starts_with("1,2,0.0000000000,1,0,"));
}

/// Flat spectrum at the h1 height, full checkpoint length.
struct FlatModel;

impl SpectrumModel for FlatModel {
    fn output_len(&self) -> usize {
        300
    }

    fn predict(&mut self, batch: &[GeometryRecord]) -> Result<Vec<Vec<f64>>, AppError> {
        Ok(batch.iter().map(|g| vec![g.heights()[0]; 300]).collect())
    }
}

const CHECKPOINT_PARAMS: &str =
    r#"{"fc_filters":[10,150],"tconv_dims":[300],"tconv_filters":[4],"n_branch":1,"batch_size":2}"#;

#[test]
fn checkpoint_config_drives_inference() {
    let dir = Scratch::new("checkpoint");
    dir.write("model/parameters.json", CHECKPOINT_PARAMS);
    let config = ModelConfig::load(&dir.join("model")).unwrap();
    assert_eq!(config.batch_size, 2);
    assert_eq!(config.output_len(), 300);

    let (bounds, spacing) = two_by_two();
    let grid = dir.join("grid.csv");
    run_grid(&bounds, &spacing, &grid, &truncate_opts(), false).unwrap();

    let output = InferenceOutput::in_dir(dir.path());
    let summary =
        run_inference_with(&config, &mut FlatModel, vec![grid.clone()], GeometryLayout::BARE, &output).unwrap();
    assert_eq!(summary.batches, 2);
    assert_eq!(summary.records, 4);
    let lines = read_lines(&output.predictions);
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0].split(',').count(), 300);

    let err =
        run_inference_with(&config, &mut ToyModel, vec![grid], GeometryLayout::BARE, &output).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Model);
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn missing_checkpoint_parameters_is_io_error() {
    let dir = Scratch::new("no-checkpoint");
    let err = ModelConfig::load(dir.path()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.message().contains("parameters.json"));

    dir.write("parameters.json", "{\"fc_filters\": [10]");
    assert_eq!(ModelConfig::load(dir.path()).unwrap_err().kind(), ErrorKind::Model);
}

#[test]
fn lookup_target_file_with_unconstrained_entries() {
    let dir = Scratch::new("target");
    let library = dir.write("library.csv", "9,3,9\n0,2,0\n5,5,5\n");
    let target_file = dir.write("target.txt", "_,2.0,none\n");

    let target: TargetSpectrum = TargetSource::File(target_file).load(3).unwrap();
    let config = LookupConfig {
        k: 3,
        window: ReadWindow::Unbounded,
    };
    let run = run_lookup(&target, &library, None, &config).unwrap();
    let scores: Vec<f64> = run.result.candidates.iter().map(|c| c.score).collect();
    assert_eq!(scores, vec![0.0, 1.0, 9.0]);
    assert!(run.geometries.is_none());
}

#[test]
fn lookup_rejects_short_library_lines() {
    let dir = Scratch::new("short");
    let library = dir.write("library.csv", "1,2,3\n1,2\n");
    let target = TargetSpectrum::from_points(3, &[(0, 1.0)]).unwrap();
    let config = LookupConfig {
        k: 1,
        window: ReadWindow::Unbounded,
    };
    let err = run_lookup(&target, &library, None, &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RecordLength);
}

#[test]
fn augment_appends_ratio_columns() {
    let dir = Scratch::new("augment");
    dir.write("raw/run1.csv", "0,1,1,2,4,8,10,20,30,40,0.5\n");

    let files = add_ratio_columns(&dir.join("raw"), &dir.join("out"), GeometryLayout::WITH_IDS).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].output, dir.join("out/run1_div01.csv"));
    assert_eq!(files[0].rows, 1);

    let lines = read_lines(&files[0].output);
    let fields: Vec<&str> = lines[0].split(',').collect();
    assert_eq!(fields.len(), 2 + 8 + 16 + 1);
    assert_eq!(fields[10], "10.000000");
    assert_eq!(fields[25], "5.000000");
    assert_eq!(fields[26], "0.500000");

    // Output files are opened for append.
    add_ratio_columns(&dir.join("raw"), &dir.join("out"), GeometryLayout::WITH_IDS).unwrap();
    assert_eq!(read_lines(&files[0].output).len(), 2);
}
