/// Like toggling shared by pins and projects

/// Add `user_id` to `likes` if absent, remove it if present.
///
/// Returns whether the user likes the item afterwards.
pub fn toggle_like(likes: &mut Vec<String>, user_id: &str) -> bool {
    if let Some(index) = likes.iter().position(|id| id == user_id) {
        likes.remove(index);
        false
    } else {
        likes.push(user_id.to_string());
        true
    }
}
