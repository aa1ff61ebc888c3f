//! Splits a target set and port set into dispatchable units of work.

use std::net::IpAddr;

use portmesh_core::Subpart;
use rand::seq::SliceRandom;
use rand::thread_rng;

/// Split `ports` into chunks of roughly `ports_per_subpart` each, one
/// subpart per chunk per target, then interleave targets by shuffling the
/// full list. A target is never front-loaded relative to the others.
pub fn generate_by_chunk_size(targets: &[IpAddr], ports: &[u16], ports_per_subpart: usize) -> Vec<Subpart> {
    generate(targets, ports, |shuffled| {
        shuffled.chunks(ports_per_subpart.max(1)).map(<[u16]>::to_vec).collect()
    })
}

/// Split `ports` into exactly `nb_subparts` chunks per target (plus a
/// remainder chunk if it doesn't divide evenly).
pub fn generate_by_count(targets: &[IpAddr], ports: &[u16], nb_subparts: usize) -> Vec<Subpart> {
    generate(targets, ports, |shuffled| {
        if nb_subparts == 0 || shuffled.is_empty() {
            return vec![shuffled.to_vec()];
        }
        let chunk_size = (shuffled.len() / nb_subparts).max(1);
        shuffled.chunks(chunk_size).map(<[u16]>::to_vec).collect()
    })
}

fn generate(
    targets: &[IpAddr],
    ports: &[u16],
    split: impl Fn(&[u16]) -> Vec<Vec<u16>>,
) -> Vec<Subpart> {
    if ports.is_empty() {
        return Vec::new();
    }

    let mut rng = thread_rng();
    let mut all = Vec::new();

    for &target in targets {
        let mut shuffled = ports.to_vec();
        shuffled.shuffle(&mut rng);

        for chunk in split(&shuffled) {
            if !chunk.is_empty() {
                all.push(Subpart { target, ports: chunk });
            }
        }
    }

    all.shuffle(&mut rng);
    all
}
