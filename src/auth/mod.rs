// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP authentication for 2N devices.
//!
//! 2N devices accept either HTTP Basic authentication or Digest
//! authentication (RFC 7616). Basic credentials are sent with every request;
//! Digest credentials are computed on demand from the challenge returned with
//! a `401 Unauthorized` response.
//!
//! - [`Credentials`] and [`AuthMethod`] describe how a client logs in
//! - [`DigestAuthenticator`] answers digest challenges

mod credentials;
mod digest;

pub use credentials::{AuthMethod, Credentials};
pub use digest::{DigestAlgorithm, DigestAuthenticator, DigestChallenge};
