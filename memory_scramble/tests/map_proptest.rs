//! Property tests for board-wide card substitution.

use std::collections::HashMap;

use memory_scramble::board::{self, PlayerId};
use proptest::prelude::*;

fn label() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("A".to_string()),
        Just("B".to_string()),
        Just("C".to_string())
    ]
}

fn target_label() -> impl Strategy<Value = String> {
    // Disjoint from the source alphabet, so substitutions never chain.
    prop_oneof![
        Just("X".to_string()),
        Just("Y".to_string()),
        Just("Z".to_string())
    ]
}

fn run<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Runtime::new()
        .expect("runtime")
        .block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After `map` with a pure function, two cells that held equal values
    /// still hold equal values: a revealed pair still matches.
    #[test]
    fn map_preserves_pairwise_equality(
        height in 1usize..=4,
        width in 1usize..=4,
        labels in prop::collection::vec(label(), 16),
        targets in prop::collection::vec(target_label(), 3),
    ) {
        let cells = height * width;
        let labels = &labels[..cells];

        // Two positions that hold the same card, if the board has any.
        let pair = (0..cells)
            .flat_map(|i| ((i + 1)..cells).map(move |j| (i, j)))
            .find(|&(i, j)| labels[i] == labels[j]);
        prop_assume!(pair.is_some());
        let (i, j) = pair.unwrap();

        let mut text = format!("{height}x{width}\n");
        for l in labels {
            text.push_str(l);
            text.push('\n');
        }

        let table: HashMap<String, String> = ["A", "B", "C"]
            .iter()
            .zip(&targets)
            .map(|(from, to)| (from.to_string(), to.clone()))
            .collect();

        let distinct_present = {
            let mut seen: Vec<&String> = labels.iter().collect();
            seen.sort();
            seen.dedup();
            seen.len() as u64
        };

        run(async move {
            let board = board::parse(&text).unwrap();
            let p = PlayerId::new("prop").unwrap();

            let view = board.flip(&p, i / width, i % width).await.unwrap();
            assert_eq!(
                view.lines().nth(1 + i).unwrap(),
                format!("my {}", labels[i])
            );
            let before = board.version().await;

            board
                .map_cards(&p, |card| {
                    table.get(card).cloned().unwrap_or_else(|| card.to_string())
                })
                .await;

            // Every distinct present value mapped to a different string, so
            // each contributed exactly one version bump.
            assert_eq!(board.version().await, before + distinct_present);

            // The revealed cell shows the substituted value.
            let mapped = &table[&labels[i]];
            let view = board.look(&p).await;
            assert_eq!(view.lines().nth(1 + i).unwrap(), format!("my {mapped}"));

            // The pair still matches: flipping the partner is a rule 2-D
            // match, leaving both controlled.
            let view = board.flip(&p, j / width, j % width).await.unwrap();
            assert_eq!(view.lines().nth(1 + i).unwrap(), format!("my {mapped}"));
            assert_eq!(view.lines().nth(1 + j).unwrap(), format!("my {mapped}"));
        });
    }
}
