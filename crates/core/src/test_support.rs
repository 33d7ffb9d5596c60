// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::correlation::Correlation;

/// A fixed correlation bundle for deterministic test assertions.
pub fn fixed_correlation() -> Correlation {
    Correlation::new("req-test-0001", "trace-test-0001")
}

/// Proptest strategies for correlation-bearing types.
#[cfg(feature = "proptest")]
pub mod strategies {
    use crate::correlation::Correlation;
    use proptest::prelude::*;

    pub fn arb_correlation() -> impl Strategy<Value = Correlation> {
        ("[a-z0-9-]{4,12}", "[a-z0-9-]{4,12}")
            .prop_map(|(req, trace)| Correlation::new(format!("req-{req}"), format!("trace-{trace}")))
    }
}
