use std::collections::HashSet;

use serde_json::Value;

use crate::{
    constants::{
        EMAIL_LENGTH, IMAGE_LENGTH, MAX_AMOUNT, MAX_COOKING_TIME, MIN_AMOUNT, MIN_COOKING_TIME,
        MIN_PASSWORD_LENGTH, PASSWORD_LENGTH, RECIPE_NAME_LENGTH, RECIPE_TEXT_LENGTH,
        USER_NAME_LENGTH,
    },
    error::{Error, HtmlError},
    form::Form,
    schema::Id,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: Id,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: String,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Id>,
}

/// Scalar fields are optional on update, the ingredient and tag lists are not.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeUpdate {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<String>,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Id>,
}

pub fn parse_new_recipe(value: Value) -> Result<NewRecipe, Error> {
    let mut form = Form::from_value(value)?;

    let name = form.get_str("name", RECIPE_NAME_LENGTH);
    let text = form.get_str("text", RECIPE_TEXT_LENGTH);
    let cooking_time = form.get_int("cooking_time", MIN_COOKING_TIME, MAX_COOKING_TIME);
    let image = form.get_str("image", IMAGE_LENGTH);
    let ingredients = parse_ingredients(&mut form);
    let tags = parse_tags(&mut form);
    form.finish()?;

    let (Some(name), Some(text), Some(cooking_time), Some(image), Some(ingredients), Some(tags)) =
        (name, text, cooking_time, image, ingredients, tags)
    else {
        return Err(HtmlError::InvalidRequest.default());
    };

    Ok(NewRecipe {
        name,
        text,
        cooking_time,
        image,
        ingredients,
        tags,
    })
}

pub fn parse_recipe_update(value: Value) -> Result<RecipeUpdate, Error> {
    let mut form = Form::from_value(value)?;

    let name = form.get_optional_str("name", RECIPE_NAME_LENGTH);
    let text = form.get_optional_str("text", RECIPE_TEXT_LENGTH);
    let cooking_time = form.get_optional_int("cooking_time", MIN_COOKING_TIME, MAX_COOKING_TIME);
    let image = form.get_optional_str("image", IMAGE_LENGTH);
    let ingredients = parse_ingredients(&mut form);
    let tags = parse_tags(&mut form);
    form.finish()?;

    let (Some(ingredients), Some(tags)) = (ingredients, tags) else {
        return Err(HtmlError::InvalidRequest.default());
    };

    Ok(RecipeUpdate {
        name,
        text,
        cooking_time,
        image,
        ingredients,
        tags,
    })
}

fn parse_ingredients(form: &mut Form) -> Option<Vec<IngredientAmount>> {
    let items = form.get_list("ingredients")?;
    if items.is_empty() {
        form.add_error("ingredients", "At least one ingredient is required.");
        return None;
    }

    let mut ingredients = Vec::with_capacity(items.len());
    let mut seen = HashSet::new();
    let mut valid = true;

    for (index, item) in items.into_iter().enumerate() {
        let mut item_form = match Form::from_value(item) {
            Ok(item_form) => item_form,
            Err(_) => {
                form.add_error("ingredients", format!("Item {}: expected an object.", index + 1));
                valid = false;
                continue;
            }
        };

        let id = item_form.get_int("id", 1, i32::MAX);
        let amount = item_form.get_int("amount", MIN_AMOUNT, MAX_AMOUNT);

        for (field, messages) in item_form.into_errors() {
            for message in messages {
                form.add_error("ingredients", format!("Item {} {field}: {message}", index + 1));
            }
            valid = false;
        }

        if let (Some(id), Some(amount)) = (id, amount) {
            if !seen.insert(id) {
                form.add_error(
                    "ingredients",
                    format!("Ingredient {id} is listed more than once."),
                );
                valid = false;
            }
            ingredients.push(IngredientAmount { id, amount });
        }
    }

    valid.then_some(ingredients)
}

fn parse_tags(form: &mut Form) -> Option<Vec<Id>> {
    let items = form.get_list("tags")?;
    if items.is_empty() {
        form.add_error("tags", "At least one tag is required.");
        return None;
    }

    let mut tags = Vec::with_capacity(items.len());
    let mut valid = true;

    for item in items {
        let id = item
            .as_i64()
            .or_else(|| item.as_str().and_then(|value| value.parse().ok()))
            .and_then(|id| Id::try_from(id).ok())
            .filter(|id| *id >= 1);

        match id {
            Some(id) if tags.contains(&id) => {
                form.add_error("tags", format!("Tag {id} is listed more than once."));
                valid = false;
            }
            Some(id) => tags.push(id),
            None => {
                form.add_error("tags", format!("Invalid tag id: {item}."));
                valid = false;
            }
        }
    }

    valid.then_some(tags)
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

pub fn parse_registration(value: Value) -> Result<NewUser, Error> {
    let mut form = Form::from_value(value)?;

    let email = form.get_str("email", EMAIL_LENGTH).map(|email| normalize_email(&email));
    let username = form.get_str("username", USER_NAME_LENGTH);
    let first_name = form.get_str("first_name", USER_NAME_LENGTH);
    let last_name = form.get_str("last_name", USER_NAME_LENGTH);
    let password = form.get_str("password", PASSWORD_LENGTH);

    if let Some(email) = &email {
        if !is_valid_email(email) {
            form.add_error("email", "Enter a valid email address.");
        }
    }
    if let Some(username) = &username {
        if !is_valid_username(username) {
            form.add_error(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
    }
    if let (Some(password), Some(username), Some(email)) = (&password, &username, &email) {
        for message in validate_password(password, username, email) {
            form.add_error("password", message);
        }
    }
    form.finish()?;

    let (Some(email), Some(username), Some(first_name), Some(last_name), Some(password)) =
        (email, username, first_name, last_name, password)
    else {
        return Err(HtmlError::InvalidRequest.default());
    };

    Ok(NewUser {
        email,
        username,
        first_name,
        last_name,
        password,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub fn parse_login(value: Value) -> Result<Credentials, Error> {
    let mut form = Form::from_value(value)?;

    let email = form.get_str("email", EMAIL_LENGTH).map(|email| normalize_email(&email));
    let password = form.get_str("password", PASSWORD_LENGTH);
    form.finish()?;

    let (Some(email), Some(password)) = (email, password) else {
        return Err(HtmlError::InvalidRequest.default());
    };

    Ok(Credentials { email, password })
}

#[derive(Debug, Clone, PartialEq)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

pub fn parse_password_change(value: Value) -> Result<PasswordChange, Error> {
    let mut form = Form::from_value(value)?;

    let current_password = form.get_str("current_password", PASSWORD_LENGTH);
    let new_password = form.get_str("new_password", PASSWORD_LENGTH);
    form.finish()?;

    let (Some(current_password), Some(new_password)) = (current_password, new_password) else {
        return Err(HtmlError::InvalidRequest.default());
    };

    Ok(PasswordChange {
        current_password,
        new_password,
    })
}

/// Messages for every password rule `password` breaks.
pub fn validate_password(password: &str, username: &str, email: &str) -> Vec<String> {
    let mut messages = vec![];

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        messages.push(format!(
            "This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        messages.push(String::from("This password is entirely numeric."));
    }

    let lowered = password.to_lowercase();
    let local_part = email.split('@').next().unwrap_or_default().to_lowercase();
    if lowered == username.to_lowercase() || (!local_part.is_empty() && lowered == local_part) {
        messages.push(String::from("The password is too similar to the account details."));
    }

    messages
}

/// Lowercases the domain part, the local part is kept as typed.
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_owned(),
    }
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '.' | '@' | '+' | '-' | '_'))
}
