// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs::copy;
use std::fs::create_dir_all;
use std::path::Path;

use kotoba_core::error::Fallible;
use tempfile::tempdir;
use walkdir::WalkDir;

/// Copies the `test` deck directory into a fresh temporary directory and
/// returns its path. The directory outlives the test.
pub fn create_tmp_copy_of_test_directory() -> Fallible<String> {
    let source = Path::new(env!("CARGO_MANIFEST_DIR")).join("test");
    let target = tempdir()?.keep();
    for entry in WalkDir::new(&source) {
        let entry = entry.map_err(std::io::Error::from)?;
        let Ok(relative) = entry.path().strip_prefix(&source) else {
            continue;
        };
        let destination = target.join(relative);
        if entry.file_type().is_dir() {
            create_dir_all(&destination)?;
        } else {
            copy(entry.path(), &destination)?;
        }
    }
    Ok(target.canonicalize()?.display().to_string())
}
