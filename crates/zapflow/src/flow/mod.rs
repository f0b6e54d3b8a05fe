// Zapflow
// Copyright (C) 2025 Zapflow contributors

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

pub mod interpret;

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serializes the read-modify-write of a conversation's flow state: two
/// near-simultaneous messages from the same sender are processed one after
/// the other instead of racing.
#[derive(Clone, Default)]
pub struct ConversationLocks {
    inner: Arc<Mutex<HashMap<(String, String), Arc<Mutex<()>>>>>,
}

impl ConversationLocks {
    pub async fn acquire(&self, bot_id: &str, user_number: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry((bot_id.to_owned(), user_number.to_owned()))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }
}
