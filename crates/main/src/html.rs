use db::user::User;
use maud::{html, Markup, DOCTYPE};

/// Renders an HTML page with the provided body markup.
pub fn page_of_body(body: Markup, user: Option<User>) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                title { "BuildClub" }
                link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css" rel="stylesheet" integrity="sha384-QWTKZyjpPEjISv5WaRU9OFeRpok6YctnYmDr5pNlyT2bRjXh0JMhjY6hW+ALEwIH" crossorigin="anonymous" {}
                meta name="viewport" content="width=device-width, initial-scale=1" {}
            }
            body {
                nav class="navbar navbar-expand" style="background-color: #1B4332" data-bs-theme="dark" {
                    div class="container-fluid" {
                        ul class="nav nav-justify-start" data-bs-theme="dark" {
                            li class="nav-item" {
                                a class="nav-link text-white" href="/" { "Home" }
                            }
                            li class="nav-item" {
                                a class="nav-link text-white" href="/events" { "Events" }
                            }
                        }
                        ul class="nav nav-justify-end" data-bs-theme="dark" {
                            @if let Some(user) = &user {
                                li class="nav-item" {
                                    span class="nav-link text-white" {
                                        "Signed in as " (user.username)
                                    }
                                }
                            } @else {
                                li {
                                    a class="nav-link text-white" href="/auth/google" { "Sign in" }
                                }
                            }
                        }
                    }
                }
                div class="container" {
                    div class="mt-4" {
                        (body)
                    }
                }
            }
        }
    }
}

pub fn page_title(title: &str) -> Markup {
    html! {
        h1 { (title) }
    }
}
