#![no_main]

use hl7_profile::aggregator::FieldAggregator;
use hl7_profile::decoder::decode_message;
use hl7_profile::sequence::profile_category;
use hl7_profile::vocabulary::Vocabulary;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    // Decoding must never panic; anything decodable must aggregate and profile
    if let Ok(message) = decode_message(&text) {
        if let Ok(vocab) = Vocabulary::default_hl7() {
            let mut aggregator = FieldAggregator::new(&vocab);
            aggregator.add_message(&message);
            let _ = aggregator.finish();
        }
        let profile = profile_category(std::iter::once(&message));
        assert_eq!(profile.pattern_total(), 1);
    }
});
