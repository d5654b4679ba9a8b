use crate::web::templates::escape_html;

/// CSS for the drop zone, staged list and result rows.
pub const UPLOAD_WIDGET_STYLES: &str = r#"
.ug-upload-widget { display: flex; flex-direction: column; gap: 1rem; }
.ug-upload-dropzone { border: 2px dashed #cbd5f5; border-radius: 12px; padding: 2rem; text-align: center; background: #f8fafc; color: #475569; transition: border-color 0.2s ease, background 0.2s ease; cursor: pointer; }
.ug-upload-dropzone[data-state="dragover"] { border-color: #2563eb; background: #e0f2fe; }
.ug-upload-icon { font-size: 2rem; }
.ug-upload-note { color: #475569; font-size: 0.9rem; margin: 0.5rem 0 0; }
.ug-upload-input { display: none; }
.ug-upload-list { display: flex; flex-direction: column; gap: 0.5rem; }
.ug-upload-item { display: flex; justify-content: space-between; align-items: center; gap: 0.5rem; padding: 0.5rem 0.75rem; border: 1px solid #e2e8f0; border-radius: 8px; background: #ffffff; color: #0f172a; }
.ug-upload-name { flex: 1; min-width: 0; word-break: break-all; }
.ug-upload-size { color: #64748b; font-size: 0.85rem; }
.ug-upload-error { color: #b91c1c; font-weight: 600; min-height: 1.25rem; }
.ug-upload-status { min-height: 1.25rem; font-size: 0.95rem; color: #2563eb; }
.ug-result { display: flex; flex-direction: column; gap: 0.5rem; padding: 1rem; border: 1px solid #e2e8f0; border-radius: 12px; }
.ug-result img { max-width: 100%; border-radius: 8px; }
.ug-copy-status { color: #166534; font-weight: 600; }
.ug-copy-status.failed { color: #b91c1c; }
.ug-loader { display: inline-block; width: 0.9rem; height: 0.9rem; border: 2px solid #ffffff; border-top-color: transparent; border-radius: 50%; animation: ug-spin 0.8s linear infinite; vertical-align: middle; }
@keyframes ug-spin { to { transform: rotate(360deg); } }
@media (max-width: 768px) {
    .ug-upload-dropzone { padding: 1.5rem 1rem; }
    .ug-upload-item { flex-direction: column; align-items: flex-start; }
}
"#;

/// Vanilla script driving the widget against the JSON API.
///
/// Every call answers with the workflow snapshot, which is rendered as is.
pub const UPLOAD_WIDGET_SCRIPT: &str = r#"<script>
(function() {
    const widget = document.querySelector('.ug-upload-widget');
    if (!widget) {
        return;
    }

    const input = widget.querySelector('input[type="file"]');
    const dropzone = widget.querySelector('[data-dropzone]');
    const prompt = widget.querySelector('[data-upload-prompt]');
    const listEl = widget.querySelector('[data-upload-list]');
    const statusEl = widget.querySelector('[data-upload-status]');
    const errorEl = widget.querySelector('[data-upload-error]');
    const uploadBtn = widget.querySelector('[data-upload-button]');
    const resetBtn = widget.querySelector('[data-reset-button]');
    const resultsEl = widget.querySelector('[data-results]');
    const copyTtl = parseInt(widget.dataset.copyTtl || '2000', 10);
    let copyTimer = null;
    let dragActive = false;

    function escapeHtml(value) {
        return String(value)
            .replace(/&/g, '&amp;')
            .replace(/</g, '&lt;')
            .replace(/>/g, '&gt;')
            .replace(/"/g, '&quot;')
            .replace(/'/g, '&#39;');
    }

    function formatSize(bytes) {
        if (bytes >= 1048576) {
            return (bytes / 1048576).toFixed(1) + ' MB';
        }
        if (bytes >= 1024) {
            return (bytes / 1024).toFixed(1) + ' KB';
        }
        return bytes + ' B';
    }

    function render(state) {
        const uploading = state.status === 'uploading';

        if (state.drag_active) {
            dropzone.dataset.state = 'dragover';
        } else {
            delete dropzone.dataset.state;
        }
        dragActive = state.drag_active;

        if (state.staged.length > 0) {
            prompt.textContent = 'Selected: ' + state.staged.map(file => file.name).join(', ');
        } else if (state.results.length > 0) {
            prompt.textContent = 'Select another image';
        } else {
            prompt.textContent = 'Drag and drop an image here or click to select';
        }

        listEl.innerHTML = state.staged.map(file =>
            `<div class="ug-upload-item"><span class="ug-upload-name">${escapeHtml(file.name)}</span><span class="ug-upload-size">${formatSize(file.size)}</span></div>`
        ).join('');

        statusEl.textContent = uploading
            ? 'Uploading ' + state.in_flight.join(', ') + '...'
            : '';
        errorEl.textContent = state.error || '';

        uploadBtn.disabled = !state.can_upload;
        uploadBtn.innerHTML = uploading
            ? '<span class="ug-loader"></span> Uploading...'
            : 'Upload Image';
        resetBtn.disabled = uploading || state.staged.length === 0;

        resultsEl.innerHTML = state.results.map(result =>
            `<div class="ug-result">
                <p>Image URL:</p>
                <input type="text" value="${escapeHtml(result.url)}" readonly>
                <button type="button" data-copy-url="${escapeHtml(result.url)}">Copy URL</button>
                <img src="${escapeHtml(result.url)}" alt="${escapeHtml(result.source_name)}">
            </div>`
        ).join('');

        if (state.copy_message) {
            const failed = state.copy_status === 'failed';
            resultsEl.insertAdjacentHTML('beforeend',
                `<div class="ug-copy-status${failed ? ' failed' : ''}">${escapeHtml(state.copy_message)}</div>`);
        }

        if (copyTimer) {
            clearTimeout(copyTimer);
            copyTimer = null;
        }
        if (state.copy_status === 'copied') {
            copyTimer = setTimeout(() => call('GET', '/api/state'), copyTtl);
        }
    }

    async function call(method, url, body) {
        const options = { method, credentials: 'same-origin' };
        if (body instanceof FormData) {
            options.body = body;
        } else if (body !== undefined) {
            options.body = JSON.stringify(body);
            options.headers = { 'Content-Type': 'application/json' };
        }

        try {
            const response = await fetch(url, options);
            if (response.status === 401) {
                window.location.href = '/';
                return;
            }
            const payload = await response.json();
            if (payload && payload.status) {
                render(payload);
            } else if (payload && payload.message) {
                errorEl.textContent = payload.message;
            }
        } catch (err) {
            errorEl.textContent = 'Request failed, please try again.';
            console.error('request error', err);
        }
    }

    function sendFiles(files, source) {
        const form = new FormData();
        Array.from(files).forEach(file => form.append('files', file, file.name));
        return call('POST', '/api/selection?source=' + source, form);
    }

    input.addEventListener('change', () => {
        if (input.files.length > 0) {
            sendFiles(input.files, 'picker');
        }
        input.value = '';
    });

    dropzone.addEventListener('click', () => input.click());
    dropzone.addEventListener('dragenter', (event) => {
        event.preventDefault();
        if (!dragActive) {
            dragActive = true;
            dropzone.dataset.state = 'dragover';
            call('POST', '/api/drag', { event: 'enter' });
        }
    });
    dropzone.addEventListener('dragover', (event) => {
        event.preventDefault();
    });
    dropzone.addEventListener('dragleave', (event) => {
        event.preventDefault();
        if (!dropzone.contains(event.relatedTarget)) {
            dragActive = false;
            delete dropzone.dataset.state;
            call('POST', '/api/drag', { event: 'leave' });
        }
    });
    dropzone.addEventListener('drop', (event) => {
        event.preventDefault();
        dragActive = false;
        delete dropzone.dataset.state;
        sendFiles(event.dataTransfer.files, 'drop');
    });

    uploadBtn.addEventListener('click', () => {
        uploadBtn.disabled = true;
        uploadBtn.innerHTML = '<span class="ug-loader"></span> Uploading...';
        call('POST', '/api/upload');
    });
    resetBtn.addEventListener('click', () => call('POST', '/api/selection/reset'));

    resultsEl.addEventListener('click', (event) => {
        const target = event.target.closest('[data-copy-url]');
        if (target) {
            call('POST', '/api/copy', { url: target.dataset.copyUrl });
        }
    });

    const initial = document.getElementById('initial-state');
    if (initial) {
        render(JSON.parse(initial.textContent));
    } else {
        call('GET', '/api/state');
    }
})();
</script>"#;

/// Declarative configuration for rendering the upload widget snippet.
#[derive(Debug, Clone)]
pub struct UploadWidgetConfig<'a> {
    pub widget_id: &'a str,
    pub input_id: &'a str,
    pub note: Option<&'a str>,
    pub accept: &'a str,
    pub max_files: usize,
    pub copy_ttl_ms: i64,
}

impl<'a> UploadWidgetConfig<'a> {
    pub fn new(widget_id: &'a str, input_id: &'a str, max_files: usize) -> Self {
        Self {
            widget_id,
            input_id,
            note: None,
            accept: "image/*",
            max_files,
            copy_ttl_ms: 2000,
        }
    }

    pub fn with_note(mut self, text: &'a str) -> Self {
        self.note = Some(text);
        self
    }

    pub fn with_copy_ttl_ms(mut self, millis: i64) -> Self {
        self.copy_ttl_ms = millis;
        self
    }
}

pub fn render_upload_widget(config: &UploadWidgetConfig<'_>) -> String {
    let note = config
        .note
        .map(|text| format!("<p class=\"ug-upload-note\">{}</p>", escape_html(text)))
        .unwrap_or_default();

    let multiple_attr = if config.max_files > 1 { " multiple" } else { "" };

    format!(
        r#"<div class="ug-upload-widget" id="{id}" data-max-files="{max_files}" data-copy-ttl="{copy_ttl}">
    <div class="ug-upload-dropzone" data-dropzone>
        <div class="ug-upload-icon">📁</div>
        <p data-upload-prompt>Drag and drop an image here or click to select</p>
        {note}
        <input class="ug-upload-input" id="{input_id}" name="files" type="file" accept="{accept}"{multiple_attr}>
    </div>
    <div class="ug-upload-list" data-upload-list></div>
    <button type="button" data-upload-button disabled>Upload Image</button>
    <button type="button" class="secondary" data-reset-button disabled>Clear selection</button>
    <div class="ug-upload-status" data-upload-status></div>
    <div class="ug-upload-error" data-upload-error role="alert"></div>
    <div data-results></div>
</div>"#,
        id = escape_html(config.widget_id),
        max_files = config.max_files,
        copy_ttl = config.copy_ttl_ms,
        note = note,
        input_id = escape_html(config.input_id),
        accept = escape_html(config.accept),
        multiple_attr = multiple_attr,
    )
}
