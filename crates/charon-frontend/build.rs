// Charon Language Server
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Build script for charon-frontend
//!
//! Links the native Charon library when the `native` feature is enabled.
//! The library location is taken from `CHARON_LIB_DIR`.

use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=CHARON_LIB_DIR");
    println!("cargo:rerun-if-env-changed=CHARON_LINK_KIND");

    if env::var_os("CARGO_FEATURE_NATIVE").is_none() {
        return;
    }

    match env::var("CHARON_LIB_DIR") {
        Ok(dir) => println!("cargo:rustc-link-search=native={}", dir),
        Err(_) => println!(
            "cargo:warning=CHARON_LIB_DIR not set, relying on the default linker search path for libcharon"
        ),
    }

    // libcharon is normally built as a static archive
    let kind = env::var("CHARON_LINK_KIND").unwrap_or_else(|_| "static".to_string());
    println!("cargo:rustc-link-lib={}=charon", kind);
}
