//! Email handling for invitations.

use std::collections::HashSet;

use crate::models::NewUserInput;

/// Emails compare case-insensitively and without surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Emails appearing more than once in an invite list, in first-seen order.
pub fn duplicate_emails(users: &[NewUserInput]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut duplicates = Vec::new();
    for user in users {
        let email = normalize_email(&user.email);
        if !seen.insert(email.clone()) && reported.insert(email.clone()) {
            duplicates.push(email);
        }
    }
    duplicates
}

/// Keep the first entry for each email; emails are normalised in the output.
pub fn unique_by_email(users: Vec<NewUserInput>) -> Vec<NewUserInput> {
    let mut seen = HashSet::new();
    users
        .into_iter()
        .filter_map(|mut user| {
            user.email = normalize_email(&user.email);
            seen.insert(user.email.clone()).then_some(user)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(email: &str) -> NewUserInput {
        NewUserInput {
            email: email.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            job_title: String::new(),
            contact_number: String::new(),
        }
    }

    #[test]
    fn finds_case_insensitive_duplicates_once() {
        let users = vec![
            input("a@x.io"),
            input("A@x.io "),
            input("b@x.io"),
            input("a@X.io"),
        ];
        assert_eq!(duplicate_emails(&users), vec!["a@x.io".to_string()]);
    }

    #[test]
    fn unique_keeps_first_occurrence() {
        let mut first = input("Ada@X.io");
        first.first_name = "Ada".to_string();
        let users = vec![first, input("ada@x.io"), input("bob@x.io")];
        let unique = unique_by_email(users);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].first_name, "Ada");
        assert_eq!(unique[0].email, "ada@x.io");
    }
}
