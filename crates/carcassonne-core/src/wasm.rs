//! WebAssembly bindings for the Carcassonne game engine.
//!
//! This module exposes the game engine to JavaScript through wasm-bindgen.

use wasm_bindgen::prelude::*;

use crate::actions::GameAction;
use crate::game::GameState;
use crate::grid::Position;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WASM-exposed game wrapper
#[wasm_bindgen]
pub struct WasmGame {
    state: GameState,
}

#[wasm_bindgen]
impl WasmGame {
    /// Create a new game for the specified number of players
    #[wasm_bindgen(constructor)]
    pub fn new(players_count: u8) -> Result<WasmGame, JsValue> {
        let state = GameState::new(players_count).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(WasmGame { state })
    }

    /// Get the current game state as JSON
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        serde_json::to_string(&self.state.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Seat a player, returns the player JSON or an error
    #[wasm_bindgen(js_name = addPlayer)]
    pub fn add_player(&mut self, name: &str) -> Result<String, JsValue> {
        let player = self
            .state
            .add_player(name)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(serde_json::to_string(&player).unwrap_or_else(|_| "null".to_string()))
    }

    /// Apply an action from JSON, returns events JSON or error
    #[wasm_bindgen(js_name = applyAction)]
    pub fn apply_action(&mut self, action_json: &str) -> Result<String, JsValue> {
        let action: GameAction = serde_json::from_str(action_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid action JSON: {}", e)))?;

        match self.state.apply_action(action) {
            Ok(events) => {
                Ok(serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string()))
            }
            Err(e) => Err(JsValue::from_str(&format!("Action failed: {}", e))),
        }
    }

    /// Cells where the tile on offer fits, as a JSON array
    #[wasm_bindgen(js_name = getValidPositions)]
    pub fn get_valid_positions(&self) -> String {
        serde_json::to_string(&self.state.valid_positions()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Claimable entity ids on the tile at (x, y), as a JSON array
    #[wasm_bindgen(js_name = getValidMeeplePositions)]
    pub fn get_valid_meeple_positions(&self, x: i32, y: i32) -> String {
        let ids = self.state.valid_meeple_positions(Position::new(x, y));
        serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string())
    }

    /// Check if the game is finished
    #[wasm_bindgen(js_name = isFinished)]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }
}
