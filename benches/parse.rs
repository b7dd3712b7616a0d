// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use proteus::format::html::{parse_fragment, serialize_fragment};

mod fixtures;
mod profiler;

// Benchmark identity (keep stable):
// - Group names in this file: `format.parse_fragment`, `format.serialize_fragment`
// - Case IDs (the string after the `/`) must remain stable across refactors so
//   results stay comparable over time (e.g. `small`, `medium_dense`, `large_deep`).
// - If implementations move/deduplicate, update the wiring but do not rename
//   group or case IDs.
fn benches_parse(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("format.parse_fragment");

        for case in [
            fixtures::page::Case::Small,
            fixtures::page::Case::MediumDense,
            fixtures::page::Case::LargeDeep,
        ] {
            let markup = fixtures::page::fixture(case);
            group.throughput(Throughput::Bytes(markup.len() as u64));
            group.bench_function(case.id(), move |b| {
                b.iter(|| {
                    let nodes = parse_fragment(black_box(&markup)).expect("parse_fragment");
                    black_box(fixtures::checksum_nodes(black_box(&nodes)))
                })
            });
        }

        group.finish();
    }

    {
        let mut group = c.benchmark_group("format.serialize_fragment");

        for case in [
            fixtures::page::Case::Small,
            fixtures::page::Case::MediumDense,
            fixtures::page::Case::LargeDeep,
        ] {
            let markup = fixtures::page::fixture(case);
            let nodes = parse_fragment(&markup).expect("parse_fragment");
            group.throughput(Throughput::Bytes(markup.len() as u64));
            group.bench_function(case.id(), move |b| {
                b.iter(|| black_box(serialize_fragment(black_box(&nodes)).len()))
            });
        }

        group.finish();
    }
}

criterion_group! {
    name = benches;
    config = profiler::criterion();
    targets = benches_parse
}
criterion_main!(benches);
