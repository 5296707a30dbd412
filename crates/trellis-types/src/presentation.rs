use std::borrow::Cow;

/// Display capability of an item type.
///
/// Hosts implement this once per item type and resolve it statically; the
/// reconciler and apply engine never look at it.
pub trait Presentable {
    /// Whether rows of this type can be picked up and dragged by the user.
    const ALLOWS_DRAGGING: bool = false;

    /// The visible string for the row.
    fn title(&self) -> Cow<'_, str>;

    /// Optional secondary text.
    fn subtitle(&self) -> Option<Cow<'_, str>> {
        None
    }

    /// Instance-level view of [`Presentable::ALLOWS_DRAGGING`].
    fn allows_dragging(&self) -> bool {
        Self::ALLOWS_DRAGGING
    }
}

impl Presentable for String {
    fn title(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}
