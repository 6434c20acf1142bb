//! Routes command tokens to the front or rear engine.

use crate::engine::MotorEngine;
use crate::errors::Error;

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Route {
    Front,
    Rear,
}

/// Left and right steer the front engine, forward and back drive the rear.
pub const DEFAULT_ROUTES: [(char, Route); 4] = [
    ('l', Route::Front),
    ('r', Route::Front),
    ('b', Route::Rear),
    ('f', Route::Rear),
];

#[derive(Debug, Clone)]
pub struct Router {
    routes: [(char, Route); 4],
}

impl Router {
    /// Build the routing table from the tokens the two engines accept.
    pub fn new(front: &MotorEngine, rear: &MotorEngine) -> Result<Self, Error> {
        let mut routes = DEFAULT_ROUTES;
        let tokens = front
            .tokens()
            .map(|token| (token, Route::Front))
            .chain(rear.tokens().map(|token| (token, Route::Rear)));
        for (slot, route) in routes.iter_mut().zip(tokens) {
            *slot = route;
        }

        for (i, (token, _)) in routes.iter().enumerate() {
            if routes[i + 1..].iter().any(|(other, _)| other == token) {
                return Err(Error::DuplicateCommandToken);
            }
        }

        Ok(Self { routes })
    }

    pub fn route(&self, token: char) -> Option<Route> {
        self.routes
            .iter()
            .find(|(candidate, _)| *candidate == token)
            .map(|(_, route)| *route)
    }

    /// Apply every character of `command` to the engine it routes to.
    ///
    /// Returns the number of characters that were applied. Characters
    /// without a route are dropped.
    pub fn dispatch(&self, command: &str, front: &mut MotorEngine, rear: &mut MotorEngine) -> usize {
        let mut applied = 0;
        for token in command.chars() {
            let recognized = match self.route(token) {
                Some(Route::Front) => front.input(token),
                Some(Route::Rear) => rear.input(token),
                None => false,
            };
            if recognized {
                applied += 1;
            }
        }
        applied
    }
}

impl Default for Router {
    fn default() -> Self {
        Self {
            routes: DEFAULT_ROUTES,
        }
    }
}
