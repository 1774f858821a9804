//! Keyboard state table
//!
//! Two snapshots are kept: the state as of the latest events and the state
//! at the end of the previous loop iteration. "Down" and "up" queries
//! compare the two, so [`KeyboardState::update`] must run exactly once per
//! iteration after everything has read the table.

use glfw::{Action, Key};

/// Number of key codes tracked
pub const NUMBER_OF_KEYS: usize = 500;

/// Anything that names a key slot
pub trait KeyCode: Copy {
    /// Raw key code, may be out of range
    fn code(self) -> i32;
}

impl KeyCode for Key {
    fn code(self) -> i32 {
        self as i32
    }
}

impl KeyCode for i32 {
    fn code(self) -> i32 {
        self
    }
}

/// Pressed/released state of every key
#[derive(Clone)]
pub struct KeyboardState {
    keys: [bool; NUMBER_OF_KEYS],
    last_keys: [bool; NUMBER_OF_KEYS],
    caps_lock: bool,
}

impl Default for KeyboardState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KeyboardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let held: Vec<usize> = (0..NUMBER_OF_KEYS).filter(|&i| self.keys[i]).collect();
        f.debug_struct("KeyboardState")
            .field("held", &held)
            .field("caps_lock", &self.caps_lock)
            .finish()
    }
}

impl KeyboardState {
    /// All keys released, caps lock off
    pub fn new() -> Self {
        Self {
            keys: [false; NUMBER_OF_KEYS],
            last_keys: [false; NUMBER_OF_KEYS],
            caps_lock: false,
        }
    }

    /// Apply one glfw key event
    pub fn handle_event(&mut self, key: Key, action: Action) {
        match action {
            Action::Press => self.press(key),
            Action::Release => self.release(key),
            Action::Repeat => {}
        }
    }

    /// Mark `key` as held
    pub fn press(&mut self, key: impl KeyCode) {
        let Some(index) = Self::index(key.code()) else {
            return;
        };
        if key.code() == Key::CapsLock as i32 && !self.keys[index] {
            self.caps_lock = !self.caps_lock;
        }
        self.keys[index] = true;
    }

    /// Mark `key` as released
    pub fn release(&mut self, key: impl KeyCode) {
        if let Some(index) = Self::index(key.code()) {
            self.keys[index] = false;
        }
    }

    /// Snapshot the current state as the previous one
    pub fn update(&mut self) {
        self.last_keys = self.keys;
    }

    /// Key is held
    pub fn is_key_pressed(&self, key: impl KeyCode) -> bool {
        self.query(key.code(), |now, _| now)
    }

    /// Key went down since the last [`KeyboardState::update`]
    pub fn is_key_down(&self, key: impl KeyCode) -> bool {
        self.query(key.code(), |now, before| now && !before)
    }

    /// Key was released since the last [`KeyboardState::update`]
    pub fn is_key_up(&self, key: impl KeyCode) -> bool {
        self.query(key.code(), |now, before| !now && before)
    }

    /// `modifier` is held and `key` is held
    pub fn is_bind_pressed(&self, modifier: impl KeyCode, key: impl KeyCode) -> bool {
        self.is_key_pressed(modifier) && self.is_key_pressed(key)
    }

    /// `modifier` is held and `key` just went down
    pub fn is_bind_down(&self, modifier: impl KeyCode, key: impl KeyCode) -> bool {
        self.is_key_pressed(modifier) && self.is_key_down(key)
    }

    /// `modifier` is held and `key` was just released
    pub fn is_bind_up(&self, modifier: impl KeyCode, key: impl KeyCode) -> bool {
        self.is_key_pressed(modifier) && self.is_key_up(key)
    }

    /// Any key is held
    pub fn is_any_key_pressed(&self) -> bool {
        self.keys.iter().any(|&held| held)
    }

    /// Caps lock toggled on
    pub fn is_caps_lock(&self) -> bool {
        self.caps_lock
    }

    fn query(&self, code: i32, test: impl Fn(bool, bool) -> bool) -> bool {
        match Self::index(code) {
            Some(index) => test(self.keys[index], self.last_keys[index]),
            None => {
                log::warn!("Key code {code} is outside the tracked range 0..{NUMBER_OF_KEYS}");
                false
            }
        }
    }

    fn index(code: i32) -> Option<usize> {
        usize::try_from(code).ok().filter(|&index| index < NUMBER_OF_KEYS)
    }
}

/// Key events held back while nothing reads the keyboard
///
/// The window queues events here while it blocks on a minimised
/// framebuffer, then replays them on the next poll so no release is lost.
#[derive(Debug, Clone, Default)]
pub struct KeyEventQueue {
    events: Vec<(Key, Action)>,
}

impl KeyEventQueue {
    /// Empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold back one event
    pub fn push(&mut self, key: Key, action: Action) {
        self.events.push((key, action));
    }

    /// Number of held events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing is held
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Apply held events to `keyboard` in arrival order and empty the queue
    pub fn replay_into(&mut self, keyboard: &mut KeyboardState) {
        for (key, action) in self.events.drain(..) {
            keyboard.handle_event(key, action);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_is_down_for_one_iteration() {
        let mut keyboard = KeyboardState::new();
        keyboard.handle_event(Key::Space, Action::Press);
        assert!(keyboard.is_key_pressed(Key::Space));
        assert!(keyboard.is_key_down(Key::Space));

        keyboard.update();
        assert!(keyboard.is_key_pressed(Key::Space));
        assert!(!keyboard.is_key_down(Key::Space));
    }

    #[test]
    fn test_release_is_up_for_one_iteration() {
        let mut keyboard = KeyboardState::new();
        keyboard.press(Key::A);
        keyboard.update();

        keyboard.handle_event(Key::A, Action::Release);
        assert!(keyboard.is_key_up(Key::A));
        assert!(!keyboard.is_key_pressed(Key::A));

        keyboard.update();
        assert!(!keyboard.is_key_up(Key::A));
    }

    #[test]
    fn test_repeat_does_not_change_state() {
        let mut keyboard = KeyboardState::new();
        keyboard.handle_event(Key::W, Action::Repeat);
        assert!(!keyboard.is_key_pressed(Key::W));
    }

    #[test]
    fn test_chords_require_modifier() {
        let mut keyboard = KeyboardState::new();
        keyboard.press(Key::F2);
        assert!(!keyboard.is_bind_down(Key::LeftControl, Key::F2));

        keyboard.press(Key::LeftControl);
        assert!(keyboard.is_bind_down(Key::LeftControl, Key::F2));
        assert!(keyboard.is_bind_pressed(Key::LeftControl, Key::F2));

        keyboard.update();
        keyboard.release(Key::F2);
        assert!(keyboard.is_bind_up(Key::LeftControl, Key::F2));
    }

    #[test]
    fn test_out_of_range_codes_are_false() {
        let mut keyboard = KeyboardState::new();
        keyboard.press(-1);
        keyboard.press(10_000);
        assert!(!keyboard.is_key_pressed(-1));
        assert!(!keyboard.is_key_down(500));
        assert!(!keyboard.is_any_key_pressed());
    }

    #[test]
    fn test_release_while_minimised_is_replayed() {
        let mut keyboard = KeyboardState::new();
        let mut queue = KeyEventQueue::new();
        keyboard.handle_event(Key::W, Action::Press);
        keyboard.update();

        // window blocked on a zero-sized framebuffer
        queue.push(Key::W, Action::Release);
        queue.push(Key::S, Action::Press);
        assert!(keyboard.is_key_pressed(Key::W));

        queue.replay_into(&mut keyboard);
        assert!(queue.is_empty());
        assert!(!keyboard.is_key_pressed(Key::W));
        assert!(keyboard.is_key_up(Key::W));
        assert!(keyboard.is_key_down(Key::S));
    }

    #[test]
    fn test_replay_keeps_arrival_order() {
        let mut keyboard = KeyboardState::new();
        let mut queue = KeyEventQueue::new();
        queue.push(Key::A, Action::Press);
        queue.push(Key::A, Action::Release);
        queue.push(Key::D, Action::Release);
        queue.push(Key::D, Action::Press);
        assert_eq!(queue.len(), 4);

        queue.replay_into(&mut keyboard);
        assert!(!keyboard.is_key_pressed(Key::A));
        assert!(keyboard.is_key_pressed(Key::D));
    }

    #[test]
    fn test_caps_lock_toggles_per_press() {
        let mut keyboard = KeyboardState::new();
        keyboard.press(Key::CapsLock);
        assert!(keyboard.is_caps_lock());

        // held key repeats do not toggle again
        keyboard.press(Key::CapsLock);
        assert!(keyboard.is_caps_lock());

        keyboard.release(Key::CapsLock);
        keyboard.press(Key::CapsLock);
        assert!(!keyboard.is_caps_lock());
    }
}
