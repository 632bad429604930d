/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - ex: gateway: ValidationGateway (authority は初回リクエストで 1 回だけ初期化)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::auth::ValidationGateway;

#[derive(Clone, Debug)]
pub struct AppState {
    pub gateway: Arc<ValidationGateway>,
}

impl AppState {
    pub fn new(gateway: Arc<ValidationGateway>) -> Self {
        Self { gateway }
    }
}
