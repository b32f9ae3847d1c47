mod health;
mod profile;
