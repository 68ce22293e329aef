use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rustc_hash::FxHashSet;

use anchortrim::*;

const MOTIF: &[u8] = b"TATAGGG";

/// Random reads of varying length, about half of them with the motif planted near the start.
fn random_reads(seed: u64, count: usize) -> Vec<Record> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

    (0..count)
        .map(|i| {
            let len = rng.gen_range(0..48);
            let mut seq = (0..len)
                .map(|_| b"ACGT"[rng.gen_range(0..4)])
                .collect::<Vec<_>>();

            for _ in 0..rng.gen_range(0..3) {
                let pos = rng.gen_range(0..24);
                if pos + MOTIF.len() <= seq.len() {
                    seq[pos..pos + MOTIF.len()].copy_from_slice(MOTIF);
                }
            }

            let qual = (0..len)
                .map(|_| rng.gen_range(b'!'..=b'J'))
                .collect::<Vec<_>>();
            Record::new(format!("@read{i}").into_bytes(), seq, b"+".to_vec(), qual).unwrap()
        })
        .collect()
}

fn to_fastq(records: &[Record]) -> Vec<u8> {
    let mut out = Vec::new();
    for record in records {
        write_fastq_record(&mut out, record).unwrap();
    }
    out
}

fn parse(output: &[u8]) -> Vec<Record> {
    iter_fastq1(output, Origin::Stream("output"), MAX_LINE_LEN)
        .collect::<Result<Vec<_>>>()
        .unwrap()
}

/// Every start position of the motif that lies entirely in the first 20 bases.
fn occurrences(seq: &[u8]) -> Vec<usize> {
    if seq.len() < WINDOW_LEN {
        return Vec::new();
    }
    (0..=WINDOW_LEN - MOTIF.len())
        .filter(|&p| &seq[p..p + MOTIF.len()] == MOTIF)
        .collect()
}

fn reference_single(seq: &[u8]) -> Option<usize> {
    let occ = occurrences(seq);
    let mut anchor = *occ.last()?;
    while let Some(&earlier) = occ.iter().rev().find(|&&p| p + MOTIF.len() <= anchor) {
        anchor = earlier;
    }
    Some(anchor)
}

fn reference_paired(seq: &[u8]) -> Option<usize> {
    occurrences(seq).last().copied()
}

fn expected_trim(record: &Record, anchor: Option<usize>) -> Option<(Vec<u8>, Vec<u8>)> {
    let cut = anchor? + MOTIF.len();
    Some((record.seq()[cut..].to_vec(), record.qual()[cut..].to_vec()))
}

fn settings(mode: Mode, threads: usize, ordered: bool) -> Settings {
    PipelineConfig {
        threads: Some(threads),
        batch_size: Some(37),
        ordered,
        ..Default::default()
    }
    .resolve(mode)
    .unwrap()
}

fn run_single_on(records: &[Record], settings: &Settings) -> Vec<Record> {
    let input = to_fastq(records);
    let mut out = Vec::new();
    let source = iter_fastq1(&input[..], Origin::Stream("input"), settings.max_line_len);
    let written = run_single(source, &mut out, &Adapter::default(), settings).unwrap();

    let parsed = parse(&out);
    assert_eq!(parsed.len() as u64, written);
    parsed
}

fn run_paired_on(r1: &[Record], r2: &[Record], settings: &Settings) -> (Vec<Record>, Vec<Record>) {
    let input1 = to_fastq(r1);
    let input2 = to_fastq(r2);
    let source = iter_fastq2(
        &input1[..],
        Origin::Stream("R1"),
        &input2[..],
        Origin::Stream("R2"),
        settings.max_line_len,
    );
    let mut out1 = Vec::new();
    let mut out2 = Vec::new();
    run_paired(source, &mut out1, &mut out2, &Adapter::default(), settings).unwrap();
    (parse(&out1), parse(&out2))
}

#[test]
fn single_end_matches_reference() {
    let reads = random_reads(1, 3000);
    let out = run_single_on(&reads, &settings(Mode::Single, 4, true));

    let expected = reads
        .iter()
        .filter_map(|r| {
            let (seq, qual) = expected_trim(r, reference_single(r.seq()))?;
            Some(Record::new(r.head().to_vec(), seq, r.plus().to_vec(), qual).unwrap())
        })
        .collect::<Vec<_>>();

    assert!(!expected.is_empty() && expected.len() < reads.len());
    assert_eq!(out, expected);
}

#[test]
fn paired_matches_reference() {
    let r1 = random_reads(2, 3000);
    let r2 = random_reads(3, 3000);
    let (out1, out2) = run_paired_on(&r1, &r2, &settings(Mode::Paired, 3, true));

    let kept = r1
        .iter()
        .zip(&r2)
        .filter_map(|(a, b)| {
            let (seq, qual) = expected_trim(a, reference_paired(a.seq()))?;
            let trimmed = Record::new(a.head().to_vec(), seq, a.plus().to_vec(), qual).unwrap();
            Some((trimmed, b.clone()))
        })
        .collect::<Vec<_>>();

    assert_eq!(out1.len(), kept.len());
    assert_eq!(out2.len(), kept.len());
    for ((got1, got2), (want1, want2)) in out1.iter().zip(&out2).zip(&kept) {
        assert_eq!(got1, want1);
        // second reads are copied byte for byte
        assert_eq!(got2, want2);
        assert_eq!(got1.id(), got2.id());
    }
}

#[test]
fn output_set_does_not_depend_on_thread_count() {
    let reads = random_reads(4, 5000);

    let baseline = run_single_on(&reads, &settings(Mode::Single, 1, false))
        .into_iter()
        .collect::<FxHashSet<_>>();
    for threads in [2, 5, 16] {
        let out = run_single_on(&reads, &settings(Mode::Single, threads, false));
        assert_eq!(out.len(), baseline.len());
        assert_eq!(out.into_iter().collect::<FxHashSet<_>>(), baseline);
    }

    let r2 = random_reads(5, 5000);
    let (base1, base2) = run_paired_on(&reads, &r2, &settings(Mode::Paired, 1, false));
    let (out1, out2) = run_paired_on(&reads, &r2, &settings(Mode::Paired, 6, false));
    assert_eq!(
        out1.into_iter().collect::<FxHashSet<_>>(),
        base1.into_iter().collect::<FxHashSet<_>>()
    );
    assert_eq!(
        out2.into_iter().collect::<FxHashSet<_>>(),
        base2.into_iter().collect::<FxHashSet<_>>()
    );
}

#[test]
fn ordered_output_follows_input_order() {
    let reads = random_reads(6, 4000);
    let index_of = |r: &Record| -> usize {
        std::str::from_utf8(&r.id()[4..]).unwrap().parse().unwrap()
    };

    for threads in [1, 3, 8] {
        let out = run_single_on(&reads, &settings(Mode::Single, threads, true));
        let indices = out.iter().map(index_of).collect::<Vec<_>>();
        assert!(indices.windows(2).all(|w| w[0] < w[1]), "{threads} threads");

        let (out1, out2) = run_paired_on(&reads, &reads, &settings(Mode::Paired, threads, true));
        assert_eq!(out1.iter().map(index_of).collect::<Vec<_>>(), indices);
        assert_eq!(out2.len(), out1.len());
    }
}

#[test]
fn trimmed_reads_are_suffixes() {
    let reads = random_reads(7, 2000);
    let out = run_single_on(&reads, &settings(Mode::Single, 2, true));
    let by_head = reads
        .iter()
        .map(|r| (r.head().to_vec(), r))
        .collect::<rustc_hash::FxHashMap<_, _>>();

    for trimmed in &out {
        let original = by_head[trimmed.head()];
        let cut = original.len() - trimmed.len();
        assert!(cut >= MOTIF.len() && cut <= WINDOW_LEN);
        assert_eq!(&original.seq()[cut - MOTIF.len()..cut], MOTIF);
        assert_eq!(&original.seq()[cut..], trimmed.seq());
        assert_eq!(&original.qual()[cut..], trimmed.qual());
        assert_eq!(original.plus(), trimmed.plus());
    }
}

#[test]
fn short_reads_never_survive() {
    let reads = random_reads(8, 2000);
    let short = reads
        .iter()
        .filter(|r| r.len() < WINDOW_LEN)
        .cloned()
        .collect::<Vec<_>>();
    assert!(short.iter().any(|r| r.seq().windows(MOTIF.len()).any(|w| w == MOTIF)));

    assert!(run_single_on(&short, &settings(Mode::Single, 2, false)).is_empty());
    let (out1, out2) = run_paired_on(&short, &short, &settings(Mode::Paired, 2, false));
    assert!(out1.is_empty() && out2.is_empty());
}

#[test]
fn second_pass_only_trims_new_anchors() {
    let reads = random_reads(9, 3000);
    let first = run_single_on(&reads, &settings(Mode::Single, 3, true));
    let second = run_single_on(&first, &settings(Mode::Single, 3, true));

    let expected = first
        .iter()
        .filter_map(|r| {
            let (seq, qual) = expected_trim(r, reference_single(r.seq()))?;
            Some(Record::new(r.head().to_vec(), seq, r.plus().to_vec(), qual).unwrap())
        })
        .collect::<Vec<_>>();
    assert_eq!(second, expected);

    // reads whose trimmed window holds no new motif never reach the second output
    let heads = second.iter().map(|r| r.head()).collect::<FxHashSet<_>>();
    for r in first.iter().filter(|r| occurrences(r.seq()).is_empty()) {
        assert!(!heads.contains(r.head()));
    }
}
