use leptos::prelude::*;
use leptos::task::spawn_local;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::api::{MarketApi, join_tickers};
use crate::auth::{STORAGE_URL_KEY, logout, use_auth};
use crate::components::icons::*;
use crate::feed::{NewsGroup, group_news, short_date, strip_markup};
use crate::models::{NewsItem, Outlook, Prediction, Price, Stock};
use crate::web::LocalStorage;
use crate::web::console;

/// 价格轮询间隔
const PRICE_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// 垂直滚动超过该偏移时显示回顶按钮
const SCROLL_TOP_THRESHOLD: f64 = 300.0;

// =========================================================
// 数据加载（读失败静默降级，写失败弹窗）
// =========================================================
//
// await 之后的信号写入一律用 try_* 变体：本应用不做请求取消，
// 响应在视图卸载后到达时应当悄悄作废，而不是写入已释放的信号。

/// 拉取自选股列表
///
/// 成功时替换缓存并把最新列表返回给调用方串联后续请求；
/// 失败只记日志，已展示的缓存保持不动。
async fn load_watchlist(
    api: &MarketApi,
    set_watchlist: WriteSignal<Vec<Stock>>,
) -> Result<Vec<Stock>, ()> {
    match api.stocks().await {
        Ok(list) => {
            let _ = set_watchlist.try_set(list.clone());
            Ok(list)
        }
        Err(e) => {
            console::warn(&format!("watchlist refresh failed: {e}"));
            Err(())
        }
    }
}

/// 拉取一组股票的新闻
///
/// 空集合直接清空新闻缓存；加载标志无论成败都会复位。
async fn load_news(
    api: &MarketApi,
    stocks: &[Stock],
    set_news: WriteSignal<Vec<NewsItem>>,
    set_news_loading: WriteSignal<bool>,
) {
    if stocks.is_empty() {
        let _ = set_news.try_set(Vec::new());
        return;
    }

    let _ = set_news_loading.try_set(true);
    match api.news(&join_tickers(stocks)).await {
        Ok(items) => {
            let _ = set_news.try_set(items);
        }
        Err(e) => console::warn(&format!("news refresh failed: {e}")),
    }
    let _ = set_news_loading.try_set(false);
}

/// 拉取一组股票的实时价格
///
/// 成功时整体替换价格缓存（不是合并，不在本次请求里的旧代码被丢弃）；
/// 失败保留上一次的缓存。
async fn load_prices(
    api: &MarketApi,
    stocks: &[Stock],
    set_prices: WriteSignal<HashMap<String, Price>>,
) {
    if stocks.is_empty() {
        return;
    }

    match api.prices(&join_tickers(stocks)).await {
        Ok(map) => {
            let _ = set_prices.try_set(map);
        }
        Err(e) => console::warn(&format!("price refresh failed: {e}")),
    }
}

/// 变更后的刷新链：自选股 -> 新闻 -> 价格
///
/// 后续请求一律使用刚返回的最新列表，而不是旧缓存，
/// 避免展示落后一步。
async fn refresh_chain(
    api: &MarketApi,
    set_watchlist: WriteSignal<Vec<Stock>>,
    set_news: WriteSignal<Vec<NewsItem>>,
    set_news_loading: WriteSignal<bool>,
    set_prices: WriteSignal<HashMap<String, Price>>,
) {
    let stocks = load_watchlist(api, set_watchlist).await.unwrap_or_default();
    load_news(api, &stocks, set_news, set_news_loading).await;
    load_prices(api, &stocks, set_prices).await;
}

// =========================================================
// 预测在途标志
// =========================================================

/// 登记一次分析请求
///
/// 同一只股票已有在途分析时返回 false，调用方应忽略本次请求；
/// 不同股票互不影响，可以并发分析。
fn begin_prediction(
    predicting: ReadSignal<HashSet<String>>,
    set_predicting: WriteSignal<HashSet<String>>,
    ticker: &str,
) -> bool {
    if predicting.with_untracked(|inflight| inflight.contains(ticker)) {
        return false;
    }
    set_predicting.update(|inflight| {
        inflight.insert(ticker.to_string());
    });
    true
}

/// 无论成败都要复位在途标志
fn finish_prediction(set_predicting: WriteSignal<HashSet<String>>, ticker: &str) {
    let _ = set_predicting.try_update(|inflight| {
        inflight.remove(ticker);
    });
}

// =========================================================
// 滚动工具
// =========================================================

fn scroll_to_top() {
    if let Some(window) = web_sys::window() {
        let opts = web_sys::ScrollToOptions::new();
        opts.set_top(0.0);
        opts.set_behavior(web_sys::ScrollBehavior::Smooth);
        window.scroll_to_with_scroll_to_options(&opts);
    }
}

fn scroll_to_stock(ticker: &str) {
    let element = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(&format!("stock-{ticker}")));

    if let Some(element) = element {
        let opts = web_sys::ScrollIntoViewOptions::new();
        opts.set_behavior(web_sys::ScrollBehavior::Smooth);
        opts.set_block(web_sys::ScrollLogicalPosition::Start);
        element.scroll_into_view_with_scroll_into_view_options(&opts);
    }
}

// =========================================================
// 仪表盘页面
// =========================================================

#[component]
pub fn DashboardPage() -> impl IntoView {
    let auth = use_auth();

    let (ticker_input, set_ticker_input) = signal(String::new());
    let (watchlist, set_watchlist) = signal(Vec::<Stock>::new());
    let (news, set_news) = signal(Vec::<NewsItem>::new());
    let (prices, set_prices) = signal(HashMap::<String, Price>::new());
    let (predictions, set_predictions) = signal(HashMap::<String, Prediction>::new());
    let (predicting, set_predicting) = signal(HashSet::<String>::new());
    let (news_loading, set_news_loading) = signal(false);
    let (show_scroll_top, set_show_scroll_top) = signal(false);
    let (show_api_config, set_show_api_config) = signal(false);
    let (api_url_input, set_api_url_input) = signal(auth.state.get_untracked().api_url.clone());

    let current_api = move || MarketApi::new(auth.state.get_untracked().api_url.clone());

    // 新闻按股票分组，新闻缓存一变就重算
    let grouped = Memo::new(move |_| news.with(|items| group_news(items)));

    // 首次加载：自选股 -> 新闻 -> 价格
    // 自选股都拉不到且界面还空着时，引导用户配置后端地址。
    let initial_load = move || {
        let api = current_api();
        spawn_local(async move {
            let stocks = match load_watchlist(&api, set_watchlist).await {
                Ok(stocks) => stocks,
                Err(()) => {
                    if watchlist.try_with_untracked(|w| w.is_empty()).unwrap_or(false) {
                        let _ = set_show_api_config.try_set(true);
                    }
                    return;
                }
            };
            if stocks.is_empty() {
                return;
            }
            load_news(&api, &stocks, set_news, set_news_loading).await;
            load_prices(&api, &stocks, set_prices).await;
        });
    };

    // 认证状态就绪后加载；后端地址变化也会经由这里重新拉取
    Effect::new(move |_| {
        let state = auth.state.get();
        if !state.is_loading && state.is_authenticated {
            initial_load();
        }
    });

    // 价格轮询：每次触发现场读取自选股缓存，绝不使用创建时的快照
    let poll = set_interval_with_handle(
        move || {
            let stocks = watchlist.get_untracked();
            if stocks.is_empty() {
                return;
            }
            let api = current_api();
            spawn_local(async move {
                load_prices(&api, &stocks, set_prices).await;
            });
        },
        PRICE_POLL_INTERVAL,
    );
    if let Ok(handle) = poll {
        on_cleanup(move || handle.clear());
    }

    // 回顶按钮的可见性跟随滚动位置
    {
        let closure = Closure::<dyn Fn()>::new(move || {
            let offset = web_sys::window()
                .and_then(|w| w.scroll_y().ok())
                .unwrap_or(0.0);
            let _ = set_show_scroll_top.try_set(offset > SCROLL_TOP_THRESHOLD);
        });
        if let Some(window) = web_sys::window() {
            let _ =
                window.add_event_listener_with_callback("scroll", closure.as_ref().unchecked_ref());
        }
        // 泄漏闭包以保持监听器存活
        closure.forget();
    }

    let handle_add = move || {
        let ticker = ticker_input.get_untracked().trim().to_uppercase();
        if ticker.is_empty() {
            return;
        }
        let api = current_api();
        spawn_local(async move {
            match api.add_stock(&ticker).await {
                Ok(_) => {
                    let _ = set_ticker_input.try_set(String::new());
                    refresh_chain(&api, set_watchlist, set_news, set_news_loading, set_prices)
                        .await;
                }
                Err(e) => {
                    // 失败时输入框保持原样，方便用户改正
                    console::warn(&format!("add {ticker} failed: {e}"));
                    console::alert("Could not add stock. It may already be in your watchlist.");
                }
            }
        });
    };

    let handle_remove = move |id: i64| {
        let api = current_api();
        spawn_local(async move {
            match api.remove_stock(id).await {
                Ok(()) => {
                    refresh_chain(&api, set_watchlist, set_news, set_news_loading, set_prices)
                        .await;
                }
                Err(e) => {
                    console::warn(&format!("remove entry {id} failed: {e}"));
                    console::alert("Could not remove stock from the watchlist.");
                }
            }
        });
    };

    let handle_analyze = move |ticker: String| {
        if !begin_prediction(predicting, set_predicting, &ticker) {
            return;
        }
        let api = current_api();
        spawn_local(async move {
            match api.predict(&ticker).await {
                Ok(prediction) => {
                    let _ = set_predictions.try_update(|cache| {
                        cache.insert(ticker.clone(), prediction);
                    });
                }
                Err(e) => {
                    console::warn(&format!("analysis for {ticker} failed: {e}"));
                    console::alert("Analysis failed. Is the AI backend running?");
                }
            }
            finish_prediction(set_predicting, &ticker);
        });
    };

    let save_api_url = move |_| {
        let url = api_url_input.get_untracked().trim().to_string();
        if url.is_empty() {
            return;
        }
        LocalStorage::set(STORAGE_URL_KEY, &url);
        // 状态变化会触发上面的加载 Effect，用新地址重新拉取
        auth.set_state.update(|state| state.api_url = url);
        set_show_api_config.set(false);
    };

    let display_name = move || {
        auth.state.with(|state| {
            state
                .user
                .as_ref()
                .map(|u| u.display_name())
                .unwrap_or_default()
        })
    };

    view! {
        <div class="min-h-screen w-full bg-slate-900 text-white p-4 md:p-8 font-sans">
            <div class="max-w-7xl mx-auto">
                <header class="mb-10 text-center relative">
                    <h1 class="text-4xl font-extrabold text-transparent bg-clip-text bg-gradient-to-r from-blue-400 to-teal-400 tracking-tight">
                        <TrendingUp attr:class="inline h-8 w-8 mr-2 text-blue-400" />
                        "Market Pulse"
                    </h1>
                    <p class="text-slate-400 mt-2">"Live prices & AI insights"</p>
                    <div class="absolute right-0 top-0 flex items-center gap-1">
                        <button
                            on:click=move |_| set_show_api_config.update(|v| *v = !*v)
                            class="p-2 text-slate-600 hover:text-slate-400"
                        >
                            "⚙️"
                        </button>
                        <span class="hidden md:inline text-sm text-slate-500">{display_name}</span>
                        <button
                            on:click=move |_| logout(&auth)
                            class="flex items-center gap-2 px-3 py-2 text-sm text-slate-400 hover:text-red-400 transition-colors"
                        >
                            <LogOut attr:class="h-4 w-4" />
                            "Sign Out"
                        </button>
                    </div>
                </header>

                // 后端连接配置
                <Show when=move || show_api_config.get()>
                    <div class="mb-8 p-4 bg-slate-800 border border-yellow-500/50 rounded-xl">
                        <h3 class="text-yellow-400 font-bold mb-2">"📡 Backend Connection"</h3>
                        <p class="text-sm text-slate-300 mb-4">
                            "If you are using a public tunnel (like ngrok/localtunnel), enter the backend URL here."
                        </p>
                        <div class="flex gap-2">
                            <input
                                type="text"
                                prop:value=api_url_input
                                on:input=move |ev| set_api_url_input.set(event_target_value(&ev))
                                placeholder="https://your-backend-url.loca.lt"
                                class="flex-1 bg-slate-900 border border-slate-700 rounded px-3 py-2 text-white"
                            />
                            <button
                                on:click=save_api_url
                                class="px-4 py-2 bg-yellow-600 hover:bg-yellow-500 text-white rounded font-bold"
                            >
                                "Connect"
                            </button>
                        </div>
                    </div>
                </Show>

                // 输入与自选股
                <div class="bg-slate-800/50 backdrop-blur-sm rounded-2xl p-6 border border-slate-700 shadow-xl mb-12 sticky top-4 z-50">
                    <div class="flex flex-col md:flex-row gap-4 justify-center items-center mb-6">
                        <div class="relative w-full max-w-md">
                            <input
                                type="text"
                                prop:value=ticker_input
                                on:input=move |ev| set_ticker_input.set(event_target_value(&ev))
                                on:keydown=move |ev: web_sys::KeyboardEvent| {
                                    if ev.key() == "Enter" {
                                        handle_add();
                                    }
                                }
                                placeholder="Add ticker (e.g. RELIANCE, TCS)"
                                class="w-full pl-4 pr-12 py-3 bg-slate-700/50 border border-slate-600 rounded-xl focus:outline-none focus:ring-2 focus:ring-blue-500 placeholder-slate-400"
                            />
                            <button
                                on:click=move |_| handle_add()
                                class="absolute right-2 top-1.5 bottom-1.5 px-4 bg-blue-600 hover:bg-blue-500 text-white rounded-lg text-sm font-medium transition-colors"
                            >
                                "Add"
                            </button>
                        </div>
                    </div>

                    <div class="flex flex-wrap gap-3 justify-center">
                        <For
                            each=move || watchlist.get()
                            key=|stock| stock.id
                            children=move |stock: Stock| {
                                let id = stock.id;
                                let t_scroll = stock.ticker.clone();
                                let t_price = stock.ticker.clone();
                                let label = stock.ticker.clone();
                                view! {
                                    <div
                                        class="group flex items-center gap-3 pl-4 pr-2 py-1.5 bg-slate-700/40 border border-slate-600/50 rounded-full hover:bg-slate-700 transition-colors cursor-pointer"
                                        on:click=move |_| scroll_to_stock(&t_scroll)
                                    >
                                        <span class="font-semibold text-sm tracking-wide text-slate-200">
                                            {label}
                                        </span>
                                        {move || {
                                            prices
                                                .with(|p| p.get(&t_price).map(|v| v.to_string()))
                                                .map(|price| {
                                                    view! {
                                                        <span class="text-xs font-mono text-blue-300 bg-blue-500/10 px-1.5 py-0.5 rounded">
                                                            "₹" {price}
                                                        </span>
                                                    }
                                                })
                                        }}
                                        <button
                                            on:click=move |ev: web_sys::MouseEvent| {
                                                ev.stop_propagation();
                                                handle_remove(id);
                                            }
                                            class="p-1 rounded-full text-slate-400 hover:text-red-400 hover:bg-red-400/10 transition-colors z-10"
                                        >
                                            <XMark attr:class="h-4 w-4" />
                                        </button>
                                    </div>
                                }
                            }
                        />
                        <Show when=move || watchlist.with(|w| w.is_empty())>
                            <span class="text-slate-500 italic">
                                "No stocks in watchlist. Add to get started."
                            </span>
                        </Show>
                    </div>
                </div>

                // 按股票分组的新闻流
                <div class="space-y-12 pb-20">
                    <Show
                        when=move || news_loading.get()
                        fallback=move || {
                            view! {
                                <For
                                    each=move || grouped.get()
                                    key=|group| group.stock.clone()
                                    children=move |group: NewsGroup| {
                                        let section_id = format!("stock-{}", group.stock);
                                        let heading = group.stock.clone();
                                        let t_price = group.stock.clone();
                                        let t_analyze = group.stock.clone();
                                        let t_flag = group.stock.clone();
                                        let t_label = group.stock.clone();
                                        let t_pred = group.stock.clone();
                                        view! {
                                            <section id=section_id class="scroll-mt-40">
                                                <div class="flex flex-col md:flex-row md:items-center gap-4 mb-6">
                                                    <div class="flex items-center gap-4">
                                                        <h2 class="text-2xl font-bold text-white tracking-wide border-l-4 border-blue-500 pl-4">
                                                            {heading}
                                                        </h2>

                                                        {move || {
                                                            prices
                                                                .with(|p| p.get(&t_price).map(|v| v.to_string()))
                                                                .map(|price| {
                                                                    view! {
                                                                        <div class="flex items-center gap-1.5 px-3 py-1 bg-slate-800 border border-slate-700 rounded-lg shadow-sm">
                                                                            <div class="w-2 h-2 rounded-full bg-green-500 animate-pulse"></div>
                                                                            <span class="text-lg font-mono font-medium text-slate-200">
                                                                                "₹" {price}
                                                                            </span>
                                                                            <span class="text-[10px] text-slate-500 uppercase tracking-wide ml-1">
                                                                                "Live"
                                                                            </span>
                                                                        </div>
                                                                    }
                                                                })
                                                        }}

                                                        <button
                                                            on:click=move |_| handle_analyze(t_analyze.clone())
                                                            disabled=move || {
                                                                predicting.with(|inflight| inflight.contains(&t_flag))
                                                            }
                                                            class="px-3 py-1 bg-purple-600/20 text-purple-300 border border-purple-500/30 hover:bg-purple-600/30 rounded-full text-xs font-semibold uppercase tracking-wider transition-all disabled:opacity-50"
                                                        >
                                                            {move || {
                                                                if predicting.with(|inflight| inflight.contains(&t_label)) {
                                                                    "Analyzing..."
                                                                } else {
                                                                    "✨ AI Analysis"
                                                                }
                                                            }}
                                                        </button>
                                                    </div>

                                                    {move || {
                                                        predictions
                                                            .with(|cache| cache.get(&t_pred).cloned())
                                                            .map(|p| {
                                                                let badge = match p.outlook() {
                                                                    Outlook::Bullish => {
                                                                        "bg-green-500/10 border-green-500/30 text-green-400"
                                                                    }
                                                                    Outlook::Bearish => {
                                                                        "bg-red-500/10 border-red-500/30 text-red-400"
                                                                    }
                                                                    Outlook::Neutral => "bg-slate-700 border-slate-600 text-slate-300",
                                                                };
                                                                view! {
                                                                    <div class=format!(
                                                                        "flex flex-wrap items-center gap-3 px-4 py-2 rounded-lg border {badge}",
                                                                    )>
                                                                        <span class="font-bold">{p.prediction.clone()}</span>
                                                                        {p
                                                                            .target
                                                                            .clone()
                                                                            .map(|target| {
                                                                                view! {
                                                                                    <span class="font-mono bg-black/20 px-2 py-0.5 rounded text-sm">
                                                                                        "Target: " {target}
                                                                                    </span>
                                                                                }
                                                                            })}
                                                                        <span class="text-sm opacity-80 border-l border-white/10 pl-3">
                                                                            {p.reason.clone()}
                                                                        </span>
                                                                    </div>
                                                                }
                                                            })
                                                    }}

                                                    <div class="h-px flex-1 bg-slate-800 hidden md:block"></div>
                                                </div>

                                                <div class="grid grid-cols-1 md:grid-cols-2 lg:grid-cols-3 gap-6">
                                                    {group
                                                        .items
                                                        .iter()
                                                        .map(|item| {
                                                            let summary = if item.summary.is_empty() {
                                                                "Click to read more...".to_string()
                                                            } else {
                                                                strip_markup(&item.summary)
                                                            };
                                                            view! {
                                                                <article class="flex flex-col h-full bg-slate-800 rounded-xl overflow-hidden border border-slate-700 hover:border-slate-600 transition-all">
                                                                    <div class="p-6 flex-1 flex flex-col">
                                                                        <div class="flex justify-between items-start mb-4 text-xs text-slate-400">
                                                                            <span>{item.source.clone()}</span>
                                                                            <span>{short_date(&item.published)}</span>
                                                                        </div>
                                                                        <h3 class="text-lg font-semibold text-slate-100 leading-snug mb-3">
                                                                            {item.title.clone()}
                                                                        </h3>
                                                                        <p class="text-sm text-slate-400 mb-4 line-clamp-3 flex-1">
                                                                            {summary}
                                                                        </p>
                                                                        <div class="mt-auto pt-4 border-t border-slate-700/50">
                                                                            <a
                                                                                href=item.link.clone()
                                                                                target="_blank"
                                                                                rel="noopener noreferrer"
                                                                                class="inline-flex items-center text-sm font-medium text-blue-400 hover:text-blue-300 transition-colors"
                                                                            >
                                                                                "Read article"
                                                                                <ExternalLink attr:class="h-4 w-4 ml-1" />
                                                                            </a>
                                                                        </div>
                                                                    </div>
                                                                </article>
                                                            }
                                                        })
                                                        .collect_view()}
                                                </div>
                                            </section>
                                        }
                                    }
                                />
                                <Show when=move || {
                                    grouped.with(|g| g.is_empty()) && !watchlist.with(|w| w.is_empty())
                                }>
                                    <div class="text-center py-20 text-slate-500">
                                        <p>"No news found for your watchlist today."</p>
                                    </div>
                                </Show>
                            }
                        }
                    >
                        <div class="flex justify-center p-12">
                            <div class="animate-spin rounded-full h-12 w-12 border-b-2 border-blue-400"></div>
                        </div>
                    </Show>
                </div>

                <Show when=move || show_scroll_top.get()>
                    <button
                        on:click=move |_| scroll_to_top()
                        class="fixed bottom-8 right-8 p-3 bg-blue-600 hover:bg-blue-500 text-white rounded-full shadow-lg z-50"
                        aria-label="Back to top"
                    >
                        <ArrowUp attr:class="h-6 w-6" />
                    </button>
                </Show>
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn stock(id: i64, ticker: &str) -> Stock {
        Stock {
            id,
            ticker: ticker.to_string(),
        }
    }

    #[test]
    fn price_poll_reads_the_watchlist_at_fire_time() {
        let (watchlist, set_watchlist) =
            signal(vec![stock(1, "TCS"), stock(2, "INFY"), stock(3, "WIPRO")]);
        let requested = Rc::new(RefCell::new(Vec::<String>::new()));

        // 与组件内轮询回调相同的读取方式：触发时现场读信号
        let tick = {
            let requested = requested.clone();
            move || {
                let stocks = watchlist.get_untracked();
                if stocks.is_empty() {
                    return;
                }
                requested.borrow_mut().push(join_tickers(&stocks));
            }
        };

        tick();
        // 第三只股票在两次触发之间被删除
        set_watchlist.update(|list| list.retain(|s| s.ticker != "WIPRO"));
        tick();

        assert_eq!(*requested.borrow(), ["TCS,INFY,WIPRO", "TCS,INFY"]);
    }

    #[test]
    fn price_poll_skips_an_empty_watchlist() {
        let (watchlist, _set_watchlist) = signal(Vec::<Stock>::new());
        let fired = Rc::new(RefCell::new(0u32));

        let tick = {
            let fired = fired.clone();
            move || {
                let stocks = watchlist.get_untracked();
                if stocks.is_empty() {
                    return;
                }
                *fired.borrow_mut() += 1;
            }
        };

        tick();
        assert_eq!(*fired.borrow(), 0);
    }

    #[test]
    fn duplicate_analysis_for_an_in_flight_ticker_is_ignored() {
        let (predicting, set_predicting) = signal(HashSet::<String>::new());

        assert!(begin_prediction(predicting, set_predicting, "TCS"));
        // 同一只股票在途时忽略
        assert!(!begin_prediction(predicting, set_predicting, "TCS"));
        // 不同股票可以并发
        assert!(begin_prediction(predicting, set_predicting, "INFY"));

        finish_prediction(set_predicting, "TCS");
        assert!(begin_prediction(predicting, set_predicting, "TCS"));
    }
}
