#![no_main]

use libfuzzer_sys::fuzz_target;

use phasetrack_core::diff::{apply_patches, diff_keyed, Keyed};

#[derive(Debug, Clone, PartialEq)]
struct Item(u8, u8);

impl Keyed for Item {
    type Key = u8;

    fn key(&self) -> u8 {
        self.0
    }
}

fn unique(bytes: &[u8]) -> Vec<Item> {
    let mut seen = [false; 256];
    bytes
        .chunks_exact(2)
        .filter(|c| !std::mem::replace(&mut seen[c[0] as usize], true))
        .map(|c| Item(c[0], c[1]))
        .collect()
}

fuzz_target!(|data: &[u8]| {
    let mid = data.len() / 2;
    let prev = unique(&data[..mid]);
    let next = unique(&data[mid..]);

    let mut list = prev.clone();
    apply_patches(&mut list, &diff_keyed(&prev, &next));
    assert_eq!(list, next);
});
