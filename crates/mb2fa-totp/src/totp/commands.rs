//! Tauri command bindings for the authenticator.
//!
//! Thin wrappers that take `State<AuthenticatorState>`, lock the mutex,
//! and delegate to the service.  Every command returns `Result<T, String>`.

use crate::totp::service::AuthenticatorState;
use crate::totp::types::*;

#[tauri::command]
pub async fn authenticator_list_display_items(
    state: tauri::State<'_, AuthenticatorState>,
) -> Result<Vec<DisplayItem>, String> {
    let mut svc = state.lock().await;
    svc.list_display_items().map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn authenticator_add_entry(
    state: tauri::State<'_, AuthenticatorState>,
    name: String,
    secret: String,
) -> Result<usize, String> {
    let mut svc = state.lock().await;
    svc.add_entry(&name, &secret).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn authenticator_entry_for_edit(
    state: tauri::State<'_, AuthenticatorState>,
    index: usize,
) -> Result<EntryForm, String> {
    let svc = state.lock().await;
    svc.entry_for_edit(index).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn authenticator_edit_entry(
    state: tauri::State<'_, AuthenticatorState>,
    index: usize,
    name: String,
    secret: String,
) -> Result<(), String> {
    let mut svc = state.lock().await;
    svc.edit_entry(index, &name, &secret).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn authenticator_delete_entry(
    state: tauri::State<'_, AuthenticatorState>,
    index: usize,
) -> Result<(), String> {
    let mut svc = state.lock().await;
    svc.delete_entry(index).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn authenticator_current_code(
    state: tauri::State<'_, AuthenticatorState>,
    index: usize,
) -> Result<String, String> {
    let svc = state.lock().await;
    svc.current_code(index).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn authenticator_tick(
    state: tauri::State<'_, AuthenticatorState>,
) -> Result<TickOutcome, String> {
    let mut svc = state.lock().await;
    svc.tick().map_err(|e| e.to_string())
}
