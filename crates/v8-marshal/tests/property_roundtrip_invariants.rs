//! Seeded property suite: random value graphs must survive a round-trip
//! unchanged, encode deterministically, and re-encode byte-identically.

use v8_marshal::jstypes::{value_eq, JsArray, JsArrayBuffer, JsMap, JsObject, JsSet};
use v8_marshal::{decode, encode, JsValue};

#[test]
fn property_roundtrip_invariants_hold_for_seeded_graphs() {
    for seed in seeds() {
        let mut rng = Lcg::new(seed);
        let mut pool = Vec::new();
        let value = random_value(&mut rng, 4, &mut pool);

        let bytes = encode(&value)
            .unwrap_or_else(|e| panic!("encode must succeed for seed {seed:#x}: {e}"));
        let again = encode(&value).unwrap();
        assert_eq!(bytes, again, "encoding must be deterministic seed={seed:#x}");

        let back = decode(&bytes)
            .unwrap_or_else(|e| panic!("decode must succeed for seed {seed:#x}: {e}"));
        assert!(
            value_eq(&value, &back),
            "round-trip invariant mismatch seed={seed:#x}"
        );

        let reencoded = encode(&back).unwrap();
        assert_eq!(
            bytes, reencoded,
            "re-encode must reproduce the stream seed={seed:#x}"
        );
    }
}

#[test]
fn shared_structure_survives_for_seeded_graphs() {
    for seed in seeds() {
        let mut rng = Lcg::new(seed);
        let shared = JsValue::object(JsObject::new());
        if let JsValue::Object(rc) = &shared {
            rc.borrow_mut().insert("tag", rng.range(1000) as i64);
        }

        // Plant the same object in two slots of a random container.
        let mut obj = JsObject::new();
        obj.insert("first", shared.clone());
        obj.insert("noise", random_value(&mut rng, 2, &mut Vec::new()));
        obj.insert("second", shared.clone());
        let value = JsValue::object(obj);

        let back = decode(&encode(&value).unwrap()).unwrap();
        let JsValue::Object(back) = back else {
            panic!("expected object");
        };
        let back = back.borrow();
        let first = back.get_named("first").unwrap();
        let second = back.get_named("second").unwrap();
        assert!(
            first.same_object(second),
            "identity must be preserved seed={seed:#x}"
        );
    }
}

fn seeds() -> [u64; 16] {
    [
        0x5eed_c0de_u64,
        0x0000_0000_0000_0001_u64,
        0x0000_0000_0000_00ff_u64,
        0x0000_0000_00c0_ffee_u64,
        0x0123_4567_89ab_cdef_u64,
        0x1111_2222_3333_4444_u64,
        0x2222_3333_4444_5555_u64,
        0x3333_4444_5555_6666_u64,
        0x4444_5555_6666_7777_u64,
        0x5555_6666_7777_8888_u64,
        0x89ab_cdef_0123_4567_u64,
        0xfedc_ba98_7654_3210_u64,
        0x1357_9bdf_2468_ace0_u64,
        0x0f0f_f0f0_55aa_aa55_u64,
        0xa5a5_5a5a_dead_beef_u64,
        0x0000_0000_0000_1001_u64,
    ]
}

struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    fn range(&mut self, n: u64) -> u64 {
        if n == 0 {
            0
        } else {
            self.next_u64() % n
        }
    }
}

fn random_scalar(rng: &mut Lcg) -> JsValue {
    match rng.range(10) {
        0 => JsValue::Undefined,
        1 => JsValue::Null,
        2 => JsValue::Bool(rng.range(2) == 1),
        3 => JsValue::Int32(rng.range(4000) as i32 - 2000),
        4 => JsValue::Uint32(rng.range(1 << 20) as u32),
        5 => JsValue::Double((rng.range(1 << 20) as f64) / 64.0 - 8000.0),
        6 => JsValue::from(format!("s{}", rng.range(100))),
        7 => JsValue::from("日本語テキスト"),
        8 => JsValue::BigInt((rng.range(u64::MAX) as i64).into()),
        _ => JsValue::date(rng.range(1 << 40) as f64),
    }
}

fn random_value(rng: &mut Lcg, depth: usize, pool: &mut Vec<JsValue>) -> JsValue {
    if depth == 0 {
        return random_scalar(rng);
    }
    // Occasionally re-reference an earlier composite so back-references
    // show up in the streams under test.
    if !pool.is_empty() && rng.range(8) == 0 {
        let pick = rng.range(pool.len() as u64) as usize;
        return pool[pick].clone();
    }
    let value = match rng.range(10) {
        0..=3 => return random_scalar(rng),
        4 => {
            let mut array = JsArray::new();
            let len = rng.range(5) as u32;
            for i in 0..len {
                array.set(i, random_value(rng, depth - 1, pool));
            }
            // Sometimes leave trailing holes.
            if rng.range(3) == 0 {
                array.set_length(len + rng.range(40) as u32);
            }
            JsValue::array(array)
        }
        5 => {
            let mut obj = JsObject::new();
            for i in 0..rng.range(5) {
                obj.insert(
                    format!("k{i}").as_str(),
                    random_value(rng, depth - 1, pool),
                );
            }
            JsValue::object(obj)
        }
        6 => {
            let mut map = JsMap::new();
            for _ in 0..rng.range(4) {
                let key = random_scalar(rng);
                map.insert(key, random_value(rng, depth - 1, pool));
            }
            JsValue::map(map)
        }
        7 => {
            let mut set = JsSet::new();
            for _ in 0..rng.range(4) {
                set.insert(random_scalar(rng));
            }
            JsValue::set(set)
        }
        8 => {
            let len = rng.range(16) as usize;
            let data: Vec<u8> = (0..len).map(|_| rng.range(256) as u8).collect();
            JsValue::array_buffer(JsArrayBuffer::new(data))
        }
        _ => {
            let mut sparse = JsArray::new();
            for _ in 0..rng.range(4) {
                let index = rng.range(4000) as u32;
                sparse.set(index, random_value(rng, depth - 1, pool));
            }
            JsValue::array(sparse)
        }
    };
    pool.push(value.clone());
    value
}
