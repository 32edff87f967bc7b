//! Text forms for authentication and record editing

use bsa_core::models::{BrandPayload, CategoryPayload, ProductPayload};
use bsa_core::{Brand, Category, Product};
use thiserror::Error;

/// A form value that cannot be sent
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{0} must be a number")]
    NotANumber(&'static str),

    #[error("{0} must be a whole number of zero or more")]
    NotACount(&'static str),
}

/// One selectable value of a picker field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub id: String,
    pub label: String,
}

impl Choice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// One labelled input. With `options` it is a picker holding the chosen id.
#[derive(Debug, Clone)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
    pub secret: bool,
    pub options: Vec<Choice>,
}

impl Field {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            secret: false,
            options: Vec::new(),
        }
    }

    pub fn is_picker(&self) -> bool {
        !self.options.is_empty()
    }

    fn secret(label: &'static str) -> Self {
        Self {
            secret: true,
            ..Self::new(label)
        }
    }

    fn with_value(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::new(label)
        }
    }

    /// Text as drawn on screen
    pub fn display(&self) -> String {
        if self.secret {
            return "*".repeat(self.value.chars().count());
        }
        if self.is_picker() {
            let label = self
                .options
                .iter()
                .find(|c| c.id == self.value)
                .map_or(self.value.as_str(), |c| c.label.as_str());
            return format!("< {} >", label);
        }
        self.value.clone()
    }

    /// Step through the options, wrapping at both ends
    fn cycle(&mut self, forward: bool) {
        let len = self.options.len();
        if len == 0 {
            return;
        }
        let next = match self.options.iter().position(|c| c.id == self.value) {
            Some(i) if forward => (i + 1) % len,
            Some(i) => (i + len - 1) % len,
            None if forward => 0,
            None => len - 1,
        };
        self.value = self.options[next].id.clone();
    }
}

/// An ordered set of fields with one focused
#[derive(Debug, Clone)]
pub struct Form {
    pub fields: Vec<Field>,
    pub focus: usize,
}

impl Form {
    fn new(fields: Vec<Field>) -> Self {
        Self { fields, focus: 0 }
    }

    pub fn next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn prev(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub fn push(&mut self, c: char) {
        if let Some(field) = self.fields.get_mut(self.focus).filter(|f| !f.is_picker()) {
            field.value.push(c);
        }
    }

    pub fn pop(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus).filter(|f| !f.is_picker()) {
            field.value.pop();
        }
    }

    /// Change the focused picker's selection
    pub fn cycle(&mut self, forward: bool) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.cycle(forward);
        }
    }

    /// Trimmed value of the field with `label`
    pub fn value(&self, label: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.trim())
            .unwrap_or("")
    }

    fn required(&self, label: &'static str) -> Result<String, FormError> {
        match self.value(label) {
            "" => Err(FormError::Required(label)),
            value => Ok(value.to_string()),
        }
    }

    fn optional(&self, label: &str) -> Option<String> {
        match self.value(label) {
            "" => None,
            value => Some(value.to_string()),
        }
    }
}

/// Login or registration form
#[derive(Debug, Clone)]
pub struct AuthForm {
    pub register: bool,
    pub form: Form,
}

impl AuthForm {
    pub fn login() -> Self {
        Self {
            register: false,
            form: Form::new(vec![Field::new("Email"), Field::secret("Password")]),
        }
    }

    pub fn register() -> Self {
        Self {
            register: true,
            form: Form::new(vec![
                Field::new("Name"),
                Field::new("Email"),
                Field::secret("Password"),
            ]),
        }
    }

    /// Switch between login and registration, keeping the email
    pub fn toggle(&mut self) {
        let email = self.form.value("Email").to_string();
        *self = if self.register {
            Self::login()
        } else {
            Self::register()
        };
        if let Some(field) = self.form.fields.iter_mut().find(|f| f.label == "Email") {
            field.value = email;
        }
    }

    pub fn name(&self) -> Result<String, FormError> {
        self.form.required("Name")
    }

    pub fn email(&self) -> Result<String, FormError> {
        self.form.required("Email")
    }

    /// Password is sent untrimmed
    pub fn password(&self) -> Result<String, FormError> {
        self.form
            .fields
            .iter()
            .find(|f| f.label == "Password")
            .map(|f| f.value.clone())
            .filter(|p| !p.is_empty())
            .ok_or(FormError::Required("Password"))
    }
}

/// Which record collection a screen or form is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Product,
    Category,
    Brand,
}

impl RecordKind {
    pub fn title(self) -> &'static str {
        match self {
            RecordKind::Product => "Product",
            RecordKind::Category => "Category",
            RecordKind::Brand => "Brand",
        }
    }
}

/// Create or edit form for one record
#[derive(Debug, Clone)]
pub struct RecordForm {
    pub kind: RecordKind,
    /// Set when editing an existing record
    pub id: Option<String>,
    pub form: Form,
}

impl RecordForm {
    pub fn new(kind: RecordKind) -> Self {
        let mut fields = vec![Field::new("Name"), Field::new("Description")];
        if kind == RecordKind::Product {
            fields.extend([
                Field::new("Price"),
                Field::new("Quantity"),
                Field::new("Category"),
                Field::new("Brand"),
            ]);
        }
        Self {
            kind,
            id: None,
            form: Form::new(fields),
        }
    }

    pub fn edit_category(category: &Category) -> Self {
        let payload = CategoryPayload::from(category);
        Self::named(RecordKind::Category, payload.id, payload.name, payload.description)
    }

    pub fn edit_brand(brand: &Brand) -> Self {
        let payload = BrandPayload::from(brand);
        Self::named(RecordKind::Brand, payload.id, payload.name, payload.description)
    }

    pub fn edit_product(product: &Product) -> Self {
        let payload = ProductPayload::from(product);
        Self {
            kind: RecordKind::Product,
            id: payload.id,
            form: Form::new(vec![
                Field::with_value("Name", payload.name),
                Field::with_value("Description", payload.description.unwrap_or_default()),
                Field::with_value("Price", payload.price.to_string()),
                Field::with_value("Quantity", payload.quantity.to_string()),
                Field::with_value("Category", payload.category),
                Field::with_value("Brand", payload.brand),
            ]),
        }
    }

    fn named(
        kind: RecordKind,
        id: Option<String>,
        name: String,
        description: Option<String>,
    ) -> Self {
        Self {
            kind,
            id,
            form: Form::new(vec![
                Field::with_value("Name", name),
                Field::with_value("Description", description.unwrap_or_default()),
            ]),
        }
    }

    /// Turn the field `label` into a picker over `choices`. Without
    /// choices it stays a plain id input.
    pub fn with_choices(mut self, label: &str, choices: Vec<Choice>) -> Self {
        if let Some(field) = self.form.fields.iter_mut().find(|f| f.label == label) {
            field.options = choices;
        }
        self
    }

    pub fn is_edit(&self) -> bool {
        self.id.is_some()
    }

    pub fn category_payload(&self) -> Result<CategoryPayload, FormError> {
        Ok(CategoryPayload {
            id: self.id.clone(),
            name: self.form.required("Name")?,
            description: self.form.optional("Description"),
        })
    }

    pub fn brand_payload(&self) -> Result<BrandPayload, FormError> {
        Ok(BrandPayload {
            id: self.id.clone(),
            name: self.form.required("Name")?,
            description: self.form.optional("Description"),
        })
    }

    pub fn product_payload(&self) -> Result<ProductPayload, FormError> {
        let price = self
            .form
            .required("Price")?
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite())
            .ok_or(FormError::NotANumber("Price"))?;
        let quantity = self
            .form
            .required("Quantity")?
            .parse::<u32>()
            .map_err(|_| FormError::NotACount("Quantity"))?;

        Ok(ProductPayload {
            id: self.id.clone(),
            name: self.form.required("Name")?,
            description: self.form.optional("Description"),
            price,
            quantity,
            category: self.form.required("Category")?,
            brand: self.form.required("Brand")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(form: &mut Form, values: &[&str]) {
        for value in values {
            for c in value.chars() {
                form.push(c);
            }
            form.next();
        }
    }

    #[test]
    fn test_focus_wraps() {
        let mut auth = AuthForm::login();
        auth.form.prev();
        assert_eq!(auth.form.focus, 1);
        auth.form.next();
        assert_eq!(auth.form.focus, 0);
    }

    #[test]
    fn test_toggle_keeps_email() {
        let mut auth = AuthForm::login();
        fill(&mut auth.form, &["ada@example.com", "secret"]);

        auth.toggle();

        assert!(auth.register);
        assert_eq!(auth.email().unwrap(), "ada@example.com");
        assert_eq!(auth.password(), Err(FormError::Required("Password")));
        assert_eq!(auth.name(), Err(FormError::Required("Name")));
    }

    #[test]
    fn test_secret_field_is_masked() {
        let mut auth = AuthForm::login();
        fill(&mut auth.form, &["a@b.c", "abc"]);
        assert_eq!(auth.form.fields[1].display(), "***");
        assert_eq!(auth.form.fields[0].display(), "a@b.c");
    }

    #[test]
    fn test_new_category_payload() {
        let mut form = RecordForm::new(RecordKind::Category);
        fill(&mut form.form, &["  Tools ", ""]);

        let payload = form.category_payload().unwrap();
        assert_eq!(payload.id, None);
        assert_eq!(payload.name, "Tools");
        assert_eq!(payload.description, None);
        assert!(!form.is_edit());
    }

    #[test]
    fn test_product_payload_validation() {
        let mut form = RecordForm::new(RecordKind::Product);
        fill(&mut form.form, &["Hammer", "", "abc", "3", "c1", "b1"]);
        assert_eq!(form.product_payload(), Err(FormError::NotANumber("Price")));

        let mut form = RecordForm::new(RecordKind::Product);
        fill(&mut form.form, &["Hammer", "", "9.5", "-1", "c1", "b1"]);
        assert_eq!(form.product_payload(), Err(FormError::NotACount("Quantity")));

        let mut form = RecordForm::new(RecordKind::Product);
        fill(&mut form.form, &["Hammer", "Steel", "9.5", "3", "c1", "b1"]);
        let payload = form.product_payload().unwrap();
        assert_eq!(payload.price, 9.5);
        assert_eq!(payload.quantity, 3);
        assert_eq!(payload.category, "c1");
        assert_eq!(payload.description.as_deref(), Some("Steel"));
    }

    #[test]
    fn test_edit_prefills_and_keeps_id() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "_id": "p1",
            "name": "Hammer",
            "price": 9.5,
            "quantity": 3,
            "category": {"_id": "c1", "name": "Tools"},
            "brand": "b1"
        }))
        .unwrap();

        let form = RecordForm::edit_product(&product);
        assert!(form.is_edit());
        assert_eq!(form.form.value("Category"), "c1");
        assert_eq!(form.form.value("Brand"), "b1");

        let payload = form.product_payload().unwrap();
        assert_eq!(payload.id.as_deref(), Some("p1"));
        assert_eq!(payload.price, 9.5);
    }

    #[test]
    fn test_picker_cycles_choices_and_ignores_typing() {
        let choices = vec![Choice::new("c1", "Tools"), Choice::new("c2", "Garden")];
        let mut form = RecordForm::new(RecordKind::Product).with_choices("Category", choices);
        form.form.focus = 4;

        form.form.push('x');
        assert_eq!(form.form.value("Category"), "");
        assert_eq!(form.form.fields[4].display(), "<  >");

        form.form.cycle(true);
        assert_eq!(form.form.value("Category"), "c1");
        assert_eq!(form.form.fields[4].display(), "< Tools >");

        form.form.cycle(true);
        form.form.cycle(true);
        assert_eq!(form.form.value("Category"), "c1");

        form.form.cycle(false);
        assert_eq!(form.form.value("Category"), "c2");
    }

    #[test]
    fn test_picker_shows_unknown_id_verbatim() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "_id": "p1", "name": "Hammer", "price": 1.0, "quantity": 1, "brand": "b7"
        }))
        .unwrap();
        let form = RecordForm::edit_product(&product)
            .with_choices("Brand", vec![Choice::new("b1", "Acme")]);
        assert_eq!(form.form.fields[5].display(), "< b7 >");
    }
}
