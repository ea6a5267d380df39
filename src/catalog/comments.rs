/// Objects that can carry a `COMMENT ON` description.
pub trait Commentable {
    fn comment(&self) -> &Option<String>;
}
