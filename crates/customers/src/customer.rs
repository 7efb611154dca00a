use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Entity, id_newtype};
use storefront_events::Event;

id_newtype!(
    /// Customer identifier.
    CustomerId
);

/// Registration input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Entity: Customer.
///
/// `email` is stored lower-cased so uniqueness can be checked by plain equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewCustomer {
    /// Validated and normalised `(name, email, phone)`.
    fn normalized(self) -> DomainResult<(String, String, Option<String>)> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        let email = normalize_email(&self.email)?;
        let phone = self
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        Ok((name.to_string(), email, phone))
    }
}

impl Customer {
    pub fn register(id: CustomerId, input: NewCustomer, now: DateTime<Utc>) -> DomainResult<Self> {
        let (name, email, phone) = input.normalized()?;
        Ok(Self {
            id,
            name,
            email,
            phone,
            created_at: now,
        })
    }

    /// Replace name, email and phone with the same rules as registration.
    /// Email uniqueness is the store's concern.
    pub fn update(&mut self, input: NewCustomer) -> DomainResult<()> {
        let (name, email, phone) = input.normalized()?;
        self.name = name;
        self.email = email;
        self.phone = phone;
        Ok(())
    }

    pub fn registered_event(&self) -> CustomerEvent {
        CustomerEvent::Registered(CustomerRegistered {
            customer_id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            occurred_at: self.created_at,
        })
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Trim, lower-case and sanity-check an email address.
///
/// Accepts exactly one `@` with non-empty local and domain parts and no whitespace.
pub fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim().to_lowercase();
    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(DomainError::validation("email must contain a single '@'")),
    };
    if local.is_empty() || domain.is_empty() {
        return Err(DomainError::validation("email must have a local part and a domain"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("email cannot contain whitespace"));
    }
    Ok(email)
}

/// Event: CustomerRegistered (drives the welcome notification).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRegistered {
    pub customer_id: CustomerId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerEvent {
    Registered(CustomerRegistered),
}

impl Event for CustomerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CustomerEvent::Registered(_) => "customers.customer.registered",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CustomerEvent::Registered(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, email: &str) -> NewCustomer {
        NewCustomer {
            name: name.to_string(),
            email: email.to_string(),
            phone: Some(" ".to_string()),
        }
    }

    #[test]
    fn register_normalizes_fields() {
        let c = Customer::register(CustomerId::generate(), input(" Asha ", " Asha@Example.COM "), Utc::now())
            .unwrap();
        assert_eq!(c.name, "Asha");
        assert_eq!(c.email, "asha@example.com");
        assert_eq!(c.phone, None);
    }

    #[test]
    fn update_applies_registration_rules() {
        let mut c = Customer::register(CustomerId::generate(), input("Asha", "asha@example.com"), Utc::now())
            .unwrap();
        let created_at = c.created_at;
        c.update(NewCustomer {
            name: " Asha K ".into(),
            email: " ASHA.K@Example.com".into(),
            phone: Some(" 98450 ".into()),
        })
        .unwrap();
        assert_eq!(c.name, "Asha K");
        assert_eq!(c.email, "asha.k@example.com");
        assert_eq!(c.phone.as_deref(), Some("98450"));
        assert_eq!(c.created_at, created_at);

        let before = c.clone();
        assert!(c.update(input("Asha", "not-an-email")).is_err());
        assert_eq!(c, before);
    }

    #[test]
    fn registered_event_carries_phone() {
        let mut new = input("Ravi", "ravi@example.com");
        new.phone = Some("080-1234".into());
        let c = Customer::register(CustomerId::generate(), new, Utc::now()).unwrap();
        let CustomerEvent::Registered(e) = c.registered_event();
        assert_eq!(e.phone.as_deref(), Some("080-1234"));
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = Customer::register(CustomerId::generate(), input("  ", "a@b.c"), Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::validation("name cannot be empty"));
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in ["", "plain", "@example.com", "user@", "a@b@c", "a b@c.d"] {
            assert!(
                matches!(normalize_email(bad), Err(DomainError::Validation(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn registered_event_carries_identity() {
        let c = Customer::register(CustomerId::generate(), input("Asha", "a@b.c"), Utc::now()).unwrap();
        let CustomerEvent::Registered(e) = c.registered_event();
        assert_eq!(e.customer_id, c.id);
        assert_eq!(c.registered_event().event_type(), "customers.customer.registered");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: normalization is idempotent on accepted addresses.
            #[test]
            fn normalize_is_idempotent(local in "[A-Za-z0-9._]{1,12}", domain in "[A-Za-z0-9.]{1,12}") {
                let once = normalize_email(&format!("{local}@{domain}")).unwrap();
                let twice = normalize_email(&once).unwrap();
                prop_assert_eq!(once, twice);
            }
        }
    }
}
