//! Book change set: permitted properties and rules for book forms.

use crate::change_set::rules::ValidationRule;
use crate::change_set::ChangeSetDefinition;
use crate::model::book::{ALTERNATE_IDS, AUTHOR, BOOK, SERIES, TITLE};
use once_cell::sync::Lazy;

/// `member_ids` is deliberately absent: it is managed by relations, not forms.
pub static BOOK_CHANGE_SET: Lazy<ChangeSetDefinition> = Lazy::new(|| {
    ChangeSetDefinition::builder(&BOOK)
        .property(TITLE)
        .property(AUTHOR)
        .property(SERIES)
        .property(ALTERNATE_IDS)
        .validates(TITLE, ValidationRule::Presence)
        .validates(AUTHOR, ValidationRule::Presence)
        .build()
        .expect("valid book change set definition")
});

#[cfg(test)]
mod tests {
    use super::BOOK_CHANGE_SET;
    use crate::model::book::{ALTERNATE_IDS, AUTHOR, MEMBER_IDS, SERIES, TITLE};

    #[test]
    fn permits_form_fields_only() {
        let permitted: Vec<_> = BOOK_CHANGE_SET.permitted().collect();
        assert_eq!(permitted, vec![TITLE, AUTHOR, SERIES, ALTERNATE_IDS]);
        assert!(!BOOK_CHANGE_SET.is_permitted(MEMBER_IDS));
    }
}
