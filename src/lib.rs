/*!
# Warning Board

A browser dashboard for scheduled warning tasks, built in Rust.

## Overview

Tasks ("warnings") are kept by a separate backend service, which also handles
admin authentication and spreadsheet parsing. This crate is the front end: it
fetches tasks over HTTP and shows them on a yearly calendar heatmap, with a
sidebar of upcoming tasks and a detail modal per day. An admin page previews
and imports Excel files through the backend.

## Architecture

### Components
- Pure views from state to a [`view::Node`] tree:
  - **heatmap**: 12 month cards colored by task density, plus the legend
  - **sidebar**: upcoming tasks with day-offset badges and urgency
  - **modal**: per-day task list grouped by department
  - **admin**: login, stats, upload, preview and import result views

### Hosts
- [`view::Node::to_html`] renders a tree into an HTTP response
- [`document::Document`] keeps mounted trees in process, with key listeners,
  timers and click bubbling, so interaction can run without a browser

### Controller
- **dashboard**: one session per page load owning data, components, the
  document and the day-request tokens that drop stale responses

### Server (feature `web`)
- **api**: reqwest client for the backend REST API
- **app**: axum routes, cookies and page rendering

## Routes

- `GET /` - Dashboard, optionally filtered with `?dept=`
- `GET /day/{date}` - Dashboard with the modal of one day open
- `GET /admin` - Login form, or stats and upload form when logged in
- `POST /admin/login`, `POST /admin/logout` - Admin session
- `POST /admin/preview`, `POST /admin/import` - Spreadsheet upload (field `file`)
- `/static/...` - Stylesheet and page script
*/

pub mod admin;
pub mod color_scale;
pub mod config;
pub mod dashboard;
pub mod date_utils;
pub mod document;
pub mod heatmap;
pub mod modal;
pub mod model;
pub mod sidebar;
pub mod templates;
pub mod view;

#[cfg(feature = "web")]
pub mod api;
#[cfg(feature = "web")]
pub mod app;

pub use config::{Config, ConfigError};
pub use dashboard::{DashboardSession, DayOutcome, DayRequest, RequestTracker};
pub use model::{Task, TaskCounts, TasksByDate};

#[cfg(feature = "web")]
pub use api::{ApiClient, ApiError};
