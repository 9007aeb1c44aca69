#![no_main]

use libfuzzer_sys::fuzz_target;
use securemesh_crypto::{deserialize, PublicKey};
use securemesh_protocol::frame;
use std::collections::BTreeMap;

fuzz_target!(|data: &[u8]| {
    // Peer-supplied bytes must never panic the frame or value decoders
    if let Ok(Some((payload, consumed))) = frame::decode(data) {
        assert!(consumed <= data.len());

        let _ = deserialize::<String>(payload);
        let _ = deserialize::<PublicKey>(payload);
        let _ = deserialize::<BTreeMap<String, (String, u16)>>(payload);
    }
});
