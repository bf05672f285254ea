//! Rule-based compliment generation from visual cues

pub mod phrases;

use doorbell_vision::FeatureMap;
use rand::Rng;
use rand::seq::IndexedRandom;

pub const BRIGHTNESS_THRESHOLD: f32 = 140.0;
pub const COLORFULNESS_THRESHOLD: f32 = 70.0;

/// The phrase pools whose cue fired, in rule order. Never empty.
pub fn fired_pools(features: &FeatureMap) -> Vec<&'static [&'static str]> {
    let mut pools = Vec::with_capacity(4);

    if features.has_face {
        pools.push(phrases::FACE);
    }
    if features.brightness > BRIGHTNESS_THRESHOLD {
        pools.push(phrases::LIGHTING);
    }
    if features.colorfulness > COLORFULNESS_THRESHOLD {
        pools.push(phrases::COLOR);
    }
    if features.centered {
        pools.push(phrases::COMPOSURE);
    }
    if pools.is_empty() {
        pools.push(phrases::FALLBACK);
    }

    pools
}

/// Build `"{phrase} {closing}"`. Each fired rule contributes one random
/// phrase from its pool, then one of those candidates is picked.
pub fn generate<R: Rng + ?Sized>(features: &FeatureMap, rng: &mut R) -> String {
    let candidates: Vec<&str> = fired_pools(features)
        .into_iter()
        .filter_map(|pool| pool.choose(rng).copied())
        .collect();

    let phrase = candidates.choose(rng).copied().unwrap_or(phrases::FALLBACK[0]);
    let closing = phrases::CLOSINGS.choose(rng).copied().unwrap_or(phrases::CLOSINGS[0]);

    format!("{} {}", phrase, closing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Always yields zero, so every pick lands on the first element
    struct ZeroRng;

    impl rand::RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            dst.fill(0);
        }
    }

    fn split(compliment: &str) -> (&str, &str) {
        phrases::CLOSINGS
            .iter()
            .find_map(|closing| {
                compliment
                    .strip_suffix(closing)
                    .and_then(|head| head.strip_suffix(' '))
                    .map(|phrase| (phrase, *closing))
            })
            .expect("compliment must end with a closing line")
    }

    #[test]
    fn test_face_with_pinned_rng() {
        let features = FeatureMap {
            has_face: true,
            brightness: 100.0,
            colorfulness: 10.0,
            ..FeatureMap::default()
        };

        assert_eq!(
            generate(&features, &mut ZeroRng),
            "Your expression feels warm and welcoming Thanks for stopping by!"
        );
    }

    #[test]
    fn test_no_cue_uses_fallback() {
        let features = FeatureMap::default();
        for seed in 0..32 {
            let compliment = generate(&features, &mut StdRng::seed_from_u64(seed));
            let (phrase, _) = split(&compliment);
            assert!(phrases::FALLBACK.contains(&phrase), "{}", compliment);
        }
    }

    #[test]
    fn test_only_fired_pools_contribute() {
        let features = FeatureMap {
            brightness: 200.0,
            colorfulness: 90.0,
            ..FeatureMap::default()
        };

        for seed in 0..64 {
            let compliment = generate(&features, &mut StdRng::seed_from_u64(seed));
            let (phrase, closing) = split(&compliment);
            assert!(
                phrases::LIGHTING.contains(&phrase) || phrases::COLOR.contains(&phrase),
                "{}",
                compliment
            );
            assert!(phrases::CLOSINGS.contains(&closing));
        }
    }

    #[test]
    fn test_thresholds_are_strict() {
        let at_threshold = FeatureMap {
            brightness: BRIGHTNESS_THRESHOLD,
            colorfulness: COLORFULNESS_THRESHOLD,
            ..FeatureMap::default()
        };
        assert_eq!(fired_pools(&at_threshold), vec![phrases::FALLBACK]);

        let above = FeatureMap {
            brightness: BRIGHTNESS_THRESHOLD + 0.5,
            ..FeatureMap::default()
        };
        assert_eq!(fired_pools(&above), vec![phrases::LIGHTING]);
    }

    #[test]
    fn test_rule_order() {
        let all = FeatureMap {
            energy: 42.0,
            brightness: 150.0,
            colorfulness: 80.0,
            has_face: true,
            centered: true,
        };
        assert_eq!(
            fired_pools(&all),
            vec![phrases::FACE, phrases::LIGHTING, phrases::COLOR, phrases::COMPOSURE]
        );
    }

    #[test]
    fn test_pools_are_populated() {
        for pool in [
            phrases::FACE,
            phrases::LIGHTING,
            phrases::COLOR,
            phrases::COMPOSURE,
            phrases::FALLBACK,
            phrases::CLOSINGS,
        ] {
            assert!(!pool.is_empty());
            assert!(pool.iter().all(|p| !p.trim().is_empty()));
        }
    }
}
